use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children side by side (first = left)
    #[default]
    Horizontal,
    /// Children stacked (first = top)
    Vertical,
}

impl SplitDirection {
    /// Pick a split direction from the container's aspect ratio.
    /// Wider-than-tall containers split side by side.
    pub fn for_container(width: f32, height: f32) -> Self {
        if width > height {
            SplitDirection::Horizontal
        } else {
            SplitDirection::Vertical
        }
    }
}

/// Pixel size of the element hosting a tab's pane tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_direction_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SplitDirection::Horizontal).unwrap(),
            "\"horizontal\""
        );
        assert_eq!(
            serde_json::to_string(&SplitDirection::Vertical).unwrap(),
            "\"vertical\""
        );
    }

    #[test]
    fn for_container_prefers_side_by_side_when_wide() {
        assert_eq!(SplitDirection::for_container(1200.0, 800.0), SplitDirection::Horizontal);
        assert_eq!(SplitDirection::for_container(600.0, 900.0), SplitDirection::Vertical);
        // Square containers stack
        assert_eq!(SplitDirection::for_container(500.0, 500.0), SplitDirection::Vertical);
    }
}
