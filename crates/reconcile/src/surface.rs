//! Collaborators the reconciler drives: the map widget and the status line.

use model::Point;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    Vehicle,
    /// Task markers are drawn as small circles, unlike vehicle pins.
    Pickup,
    Dropoff,
}

impl MarkerStyle {
    pub fn label(self) -> &'static str {
        match self {
            MarkerStyle::Vehicle => "vehicle",
            MarkerStyle::Pickup => "pickup",
            MarkerStyle::Dropoff => "dropoff",
        }
    }
}

/// Point markers with a text popup, placed on some display surface.
///
/// Handles are owned by the caller; dropping one does not remove the
/// marker, only `remove_marker` does.
pub trait MapSurface {
    type Handle: Clone + PartialEq + std::fmt::Debug;

    fn create_marker(&mut self, at: Point, style: MarkerStyle) -> Self::Handle;
    fn move_marker(&mut self, handle: &Self::Handle, at: Point);
    fn set_popup(&mut self, handle: &Self::Handle, text: &str);
    fn remove_marker(&mut self, handle: Self::Handle);

    /// Called once after every reconciled snapshot.
    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub trait StatusDisplay {
    fn set_status(&mut self, text: &str);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub struct Placed {
        pub at: Point,
        pub style: MarkerStyle,
        pub popup: String,
    }

    /// In-memory surface that remembers every live marker.
    #[derive(Default)]
    pub struct RecordingSurface {
        next: u64,
        pub live: BTreeMap<u64, Placed>,
        pub created: usize,
        pub removed: usize,
        pub presented: usize,
    }

    impl RecordingSurface {
        pub fn with_style(&self, style: MarkerStyle) -> Vec<&Placed> {
            self.live.values().filter(|p| p.style == style).collect()
        }
    }

    impl MapSurface for RecordingSurface {
        type Handle = u64;

        fn create_marker(&mut self, at: Point, style: MarkerStyle) -> u64 {
            self.next += 1;
            self.created += 1;
            self.live.insert(self.next, Placed { at, style, popup: String::new() });
            self.next
        }

        fn move_marker(&mut self, handle: &u64, at: Point) {
            self.live.get_mut(handle).expect("move of a removed marker").at = at;
        }

        fn set_popup(&mut self, handle: &u64, text: &str) {
            self.live.get_mut(handle).expect("popup on a removed marker").popup = text.to_string();
        }

        fn remove_marker(&mut self, handle: u64) {
            assert!(self.live.remove(&handle).is_some(), "double remove of {handle}");
            self.removed += 1;
        }

        fn present(&mut self) -> anyhow::Result<()> {
            self.presented += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct StatusLine(pub Vec<String>);

    impl StatusLine {
        pub fn last(&self) -> &str {
            self.0.last().map(String::as_str).unwrap_or_default()
        }
    }

    impl StatusDisplay for StatusLine {
        fn set_status(&mut self, text: &str) {
            self.0.push(text.to_string());
        }
    }
}
