//! Selector parsing and resolution: turning a user-facing token like
//! `north` or `2` into a concrete id against the current state.

use crate::geometry::Rect;
use crate::model::ids::{DisplayId, SpaceId, WindowId};

#[derive(Debug, Clone, PartialEq)]
pub enum WindowSelector {
    Id(WindowId),
    Focused,
    First,
    Last,
    Recent,
    Largest,
    Smallest,
    North,
    South,
    East,
    West,
    Sibling,
    StackNext,
    StackPrev,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpaceSelector {
    Id(SpaceId),
    /// A 1-based index into the spaces of the relevant display: integer
    /// selectors below 100 are indices, not ids.
    Index(u64),
    Label(String),
    Focused,
    Prev,
    Next,
    First,
    Last,
    Recent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplaySelector {
    Id(DisplayId),
    /// A 1-based index into the active display list.
    Index(u32),
    Label(String),
    Focused,
    Prev,
    Next,
    First,
    Last,
    Recent,
    North,
    South,
    East,
    West,
}

impl WindowSelector {
    pub fn parse(token: &str) -> Option<WindowSelector> {
        Some(match token {
            "focused" => WindowSelector::Focused,
            "first" => WindowSelector::First,
            "last" => WindowSelector::Last,
            "recent" => WindowSelector::Recent,
            "largest" => WindowSelector::Largest,
            "smallest" => WindowSelector::Smallest,
            "north" => WindowSelector::North,
            "south" => WindowSelector::South,
            "east" => WindowSelector::East,
            "west" => WindowSelector::West,
            "sibling" => WindowSelector::Sibling,
            "stack.next" => WindowSelector::StackNext,
            "stack.prev" => WindowSelector::StackPrev,
            other => other.parse::<u32>().ok().map(|n| WindowSelector::Id(WindowId(n as u64)))?,
        })
    }
}

/// Integer space selectors below 100 are 1-based indices into the
/// focused-display's user space list; at or above 100 they are raw ids.
const SPACE_INDEX_CUTOFF: u64 = 100;
const DISPLAY_INDEX_CUTOFF: u32 = 100;

impl SpaceSelector {
    pub fn parse(token: &str) -> SpaceSelector {
        match token {
            "focused" => SpaceSelector::Focused,
            "prev" => SpaceSelector::Prev,
            "next" => SpaceSelector::Next,
            "first" => SpaceSelector::First,
            "last" => SpaceSelector::Last,
            "recent" => SpaceSelector::Recent,
            other => match other.parse::<u64>() {
                Ok(n) if n < SPACE_INDEX_CUTOFF => SpaceSelector::Index(n),
                Ok(n) => SpaceSelector::Id(SpaceId(n)),
                Err(_) => SpaceSelector::Label(other.to_string()),
            },
        }
    }

    /// True if a numeric token should be treated as a 1-based index rather
    /// than a raw id.
    pub fn is_index(n: u64) -> bool { n < SPACE_INDEX_CUTOFF }
}

impl DisplaySelector {
    pub fn parse(token: &str) -> DisplaySelector {
        match token {
            "focused" => DisplaySelector::Focused,
            "prev" => DisplaySelector::Prev,
            "next" => DisplaySelector::Next,
            "first" => DisplaySelector::First,
            "last" => DisplaySelector::Last,
            "recent" => DisplaySelector::Recent,
            "north" => DisplaySelector::North,
            "south" => DisplaySelector::South,
            "east" => DisplaySelector::East,
            "west" => DisplaySelector::West,
            other => match other.parse::<u32>() {
                Ok(n) if n < DISPLAY_INDEX_CUTOFF => DisplaySelector::Index(n),
                Ok(n) => DisplaySelector::Id(DisplayId(n)),
                Err(_) => DisplaySelector::Label(other.to_string()),
            },
        }
    }

    pub fn is_index(n: u32) -> bool { n < DISPLAY_INDEX_CUTOFF }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Picks the frame among `candidates` that lies in `direction` from
/// `from`, breaking ties by center-to-center distance and then by the
/// smaller id when distances tie.
pub fn resolve_directional(
    from: WindowId,
    from_frame: Rect,
    candidates: &[(WindowId, Rect)],
    direction: Direction,
) -> Option<WindowId> {
    let origin = from_frame.mid();
    let mut best: Option<(WindowId, f64)> = None;
    for &(id, frame) in candidates {
        if id == from {
            continue;
        }
        let center = frame.mid();
        let in_direction = match direction {
            Direction::North => center.y < origin.y,
            Direction::South => center.y > origin.y,
            Direction::East => center.x > origin.x,
            Direction::West => center.x < origin.x,
        };
        if !in_direction {
            continue;
        }
        let dx = center.x - origin.x;
        let dy = center.y - origin.y;
        let distance = (dx * dx + dy * dy).sqrt();
        best = match best {
            None => Some((id, distance)),
            Some((best_id, best_dist)) => {
                if distance < best_dist || (distance == best_dist && id.0 < best_id.0) {
                    Some((id, distance))
                } else {
                    Some((best_id, best_dist))
                }
            }
        };
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_selector_under_cutoff_is_index() {
        assert_eq!(SpaceSelector::parse("3"), SpaceSelector::Index(3));
        assert_eq!(SpaceSelector::parse("150"), SpaceSelector::Id(SpaceId(150)));
    }

    #[test]
    fn directional_resolution_picks_nearest_in_direction() {
        let from = WindowId(1);
        let from_frame = Rect::new(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![
            (WindowId(2), Rect::new(200.0, 0.0, 100.0, 100.0)),
            (WindowId(3), Rect::new(1000.0, 0.0, 100.0, 100.0)),
            (WindowId(4), Rect::new(-200.0, 0.0, 100.0, 100.0)),
        ];
        let resolved = resolve_directional(from, from_frame, &candidates, Direction::East);
        assert_eq!(resolved, Some(WindowId(2)));
    }

    #[test]
    fn directional_resolution_ties_break_by_smaller_id() {
        let from = WindowId(1);
        let from_frame = Rect::new(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![
            (WindowId(5), Rect::new(200.0, 0.0, 100.0, 100.0)),
            (WindowId(2), Rect::new(200.0, 0.0, 100.0, 100.0)),
        ];
        let resolved = resolve_directional(from, from_frame, &candidates, Direction::East);
        assert_eq!(resolved, Some(WindowId(2)));
    }
}
