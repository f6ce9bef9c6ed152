//! Joining open toolpath lines end to end.
//!
//! The skeleton emits walls as many short polylines. Lines of the same
//! wall whose ends meet are concatenated, and chains that come back to
//! their own start become closed polygons. Only odd lines may be
//! reversed to fit, since even walls have a fixed direction of travel.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::debug;
use vcad_walls_math::{Coord, Point};

use crate::extrusion::ExtrusionLine;

/// Ends closer than this are the same point; one of them is dropped.
pub const SNAP_DISTANCE: Coord = 10;

/// An end of line `.0`; `.1` is true for the first junction.
type LineEnd = GeomWithData<[Coord; 2], (usize, bool)>;

fn key(p: Point) -> [Coord; 2] {
    [p.x, p.y]
}

/// Result of [`stitch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stitched {
    /// Chains that stayed open.
    pub lines: Vec<ExtrusionLine>,
    /// Chains that closed on themselves, marked `is_closed`.
    pub polygons: Vec<ExtrusionLine>,
}

fn can_connect(a: &ExtrusionLine, b: &ExtrusionLine) -> bool {
    a.is_odd == b.is_odd && a.inset_idx == b.inset_idx
}

fn squared(d: Coord) -> Coord {
    d.saturating_mul(d)
}

/// Join the lines of one wall bin wherever ends lie within
/// `max_stitch_distance` of each other.
///
/// Each chain is grown greedily at its back and then at its front, always
/// taking the nearest compatible end. Closing the chain wins over
/// extending it when its own start is at least as near.
pub fn stitch(lines: Vec<ExtrusionLine>, max_stitch_distance: Coord) -> Stitched {
    let mut pending: Vec<Option<ExtrusionLine>> = lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(Some)
        .collect();
    let ends: Vec<LineEnd> = pending
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.as_ref().map(|l| (i, l)))
        .flat_map(|(i, l)| {
            let first = l.junctions[0].p;
            let last = l.junctions[l.junctions.len() - 1].p;
            [
                GeomWithData::new(key(first), (i, true)),
                GeomWithData::new(key(last), (i, false)),
            ]
        })
        .collect();
    let tree = RTree::bulk_load(ends);
    let max_d2 = squared(max_stitch_distance);

    let mut result = Stitched::default();
    for i in 0..pending.len() {
        let Some(mut chain) = pending[i].take() else {
            continue;
        };
        let mut closed = false;
        for at_front in [false, true] {
            while !closed {
                let (end, other_end) = match (chain.junctions.first(), chain.junctions.last()) {
                    (Some(first), Some(last)) if at_front => (first.p, last.p),
                    (Some(first), Some(last)) => (last.p, first.p),
                    _ => break,
                };
                let closing_d2 = (chain.junctions.len() > 2).then(|| (end - other_end).length2());

                let candidate = tree
                    .nearest_neighbor_iter_with_distance_2(&key(end))
                    .take_while(|(_, d2)| *d2 <= max_d2)
                    .find(|(e, _)| {
                        let (j, is_first) = e.data;
                        let Some(line) = pending[j].as_ref() else {
                            return false;
                        };
                        // Appending at the back wants the other line's first
                        // junction; anything else means reversing it.
                        let needs_reverse = is_first == at_front;
                        can_connect(&chain, line) && (!needs_reverse || line.is_odd)
                    })
                    .map(|(e, d2)| (e.data, d2));

                if let Some(closing_d2) = closing_d2 {
                    let closer = candidate.map_or(true, |(_, d2)| closing_d2 <= i128::from(d2));
                    if closing_d2 <= i128::from(max_d2) && closer {
                        closed = true;
                        break;
                    }
                }
                let Some(((j, is_first), _)) = candidate else {
                    break;
                };
                let Some(mut other) = pending[j].take() else {
                    break;
                };
                if is_first == at_front {
                    other.reverse();
                }
                if at_front {
                    let shared = other
                        .junctions
                        .last()
                        .is_some_and(|j| (j.p - end).shorter_than(SNAP_DISTANCE));
                    if shared {
                        other.junctions.pop();
                    }
                    other.junctions.append(&mut chain.junctions);
                    chain.junctions = other.junctions;
                } else {
                    let skip = usize::from(
                        other
                            .junctions
                            .first()
                            .is_some_and(|j| (j.p - end).shorter_than(SNAP_DISTANCE)),
                    );
                    chain.junctions.extend(other.junctions.into_iter().skip(skip));
                }
            }
        }

        if closed {
            let duplicate_end = match (chain.junctions.first(), chain.junctions.last()) {
                (Some(first), Some(last)) => {
                    chain.junctions.len() > 3 && (last.p - first.p).shorter_than(SNAP_DISTANCE)
                }
                _ => false,
            };
            if duplicate_end {
                chain.junctions.pop();
            }
            chain.is_closed = true;
            result.polygons.push(chain);
        } else {
            result.lines.push(chain);
        }
    }
    debug!(
        lines = result.lines.len(),
        polygons = result.polygons.len(),
        "lines stitched"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::ExtrusionJunction;

    fn line(points: &[(Coord, Coord)], is_odd: bool) -> ExtrusionLine {
        let mut l = ExtrusionLine::new(0, is_odd);
        l.junctions = points
            .iter()
            .map(|&(x, y)| ExtrusionJunction::new(Point::new(x, y), 400, 0))
            .collect();
        l
    }

    #[test]
    fn test_square_pieces_close_into_polygon() {
        let pieces = vec![
            line(&[(0, 0), (1000, 0)], false),
            line(&[(1000, 1000), (0, 1000)], false),
            line(&[(1000, 0), (1000, 1000)], false),
            line(&[(0, 1000), (0, 0)], false),
        ];
        let stitched = stitch(pieces, 399);
        assert!(stitched.lines.is_empty());
        assert_eq!(stitched.polygons.len(), 1);
        let polygon = &stitched.polygons[0];
        assert!(polygon.is_closed);
        assert_eq!(polygon.junctions.len(), 4);
        assert_eq!(polygon.length(), 4000);
    }

    #[test]
    fn test_even_lines_are_not_reversed() {
        // head to head: joining would need one of them reversed
        let pieces = vec![
            line(&[(0, 0), (1000, 0)], false),
            line(&[(2000, 0), (1000, 0)], false),
        ];
        let stitched = stitch(pieces, 399);
        assert_eq!(stitched.lines.len(), 2);
        assert!(stitched.polygons.is_empty());
    }

    #[test]
    fn test_odd_lines_are_reversed_to_fit() {
        let pieces = vec![
            line(&[(0, 0), (1000, 0)], true),
            line(&[(2000, 0), (1000, 0)], true),
        ];
        let stitched = stitch(pieces, 399);
        assert_eq!(stitched.lines.len(), 1);
        let points: Vec<Point> = stitched.lines[0].junctions.iter().map(|j| j.p).collect();
        assert_eq!(
            points,
            vec![Point::new(0, 0), Point::new(1000, 0), Point::new(2000, 0)]
        );
    }

    #[test]
    fn test_odd_and_even_lines_stay_apart() {
        let pieces = vec![
            line(&[(0, 0), (1000, 0)], false),
            line(&[(1000, 0), (2000, 0)], true),
        ];
        let stitched = stitch(pieces, 399);
        assert_eq!(stitched.lines.len(), 2);
    }

    #[test]
    fn test_gap_beyond_stitch_distance() {
        let pieces = vec![
            line(&[(0, 0), (1000, 0)], false),
            line(&[(1500, 0), (2500, 0)], false),
        ];
        assert_eq!(stitch(pieces.clone(), 399).lines.len(), 2);
        assert_eq!(stitch(pieces, 600).lines.len(), 1);
    }

    #[test]
    fn test_grows_at_front_too() {
        let pieces = vec![
            line(&[(1000, 0), (2000, 0)], false),
            line(&[(0, 0), (1000, 0)], false),
        ];
        let stitched = stitch(pieces, 399);
        assert_eq!(stitched.lines.len(), 1);
        assert_eq!(stitched.lines[0].junctions[0].p, Point::new(0, 0));
        assert_eq!(stitched.lines[0].junctions.len(), 3);
    }
}
