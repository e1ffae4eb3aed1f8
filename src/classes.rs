use image::Rgb;
use serde::Serialize;

/// Semantic classes predicted by the pet segmentation model.
///
/// The declaration order is the index order of the model output channels and
/// also the order of the report lines and of the color legend. It must not be
/// reordered independently of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ClassLabel {
    Pet,
    Background,
    Border,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 3] = [ClassLabel::Pet, ClassLabel::Background, ClassLabel::Border];

    pub const COUNT: usize = Self::ALL.len();

    /// Map a mask cell to a label; anything outside `[0, COUNT)` is a gap.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ClassLabel::Pet => "Pet",
            ClassLabel::Background => "Background",
            ClassLabel::Border => "Border",
        }
    }

    pub const fn color(self) -> Rgb<u8> {
        match self {
            ClassLabel::Pet => Rgb([255, 0, 0]),
            ClassLabel::Background => Rgb([0, 255, 0]),
            ClassLabel::Border => Rgb([0, 0, 255]),
        }
    }

    pub const fn color_name(self) -> &'static str {
        match self {
            ClassLabel::Pet => "Red",
            ClassLabel::Background => "Green",
            ClassLabel::Border => "Blue",
        }
    }

    const fn swatch(self) -> &'static str {
        match self {
            ClassLabel::Pet => "🔴",
            ClassLabel::Background => "🟢",
            ClassLabel::Border => "🔵",
        }
    }

    /// One line of the static color legend, e.g. `🔴 Pet (Red)`.
    pub fn legend_line(self) -> String {
        format!("{} {} ({})", self.swatch(), self.name(), self.color_name())
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_table_order() {
        let names: Vec<_> = ClassLabel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["Pet", "Background", "Border"]);
        for (i, label) in ClassLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn test_from_index_rejects_gaps() {
        assert_eq!(ClassLabel::from_index(0), Some(ClassLabel::Pet));
        assert_eq!(ClassLabel::from_index(2), Some(ClassLabel::Border));
        assert_eq!(ClassLabel::from_index(3), None);
        assert_eq!(ClassLabel::from_index(-1), None);
    }

    #[test]
    fn test_colors() {
        assert_eq!(ClassLabel::Pet.color(), Rgb([255, 0, 0]));
        assert_eq!(ClassLabel::Background.color(), Rgb([0, 255, 0]));
        assert_eq!(ClassLabel::Border.color(), Rgb([0, 0, 255]));
        assert_eq!(ClassLabel::Border.legend_line(), "🔵 Border (Blue)");
    }
}
