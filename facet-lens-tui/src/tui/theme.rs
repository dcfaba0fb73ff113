use facet_lens_core::FieldKind;
use ratatui::style::Color;

pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub highlight: Color,
    pub filtered: Color, // header accent for columns carrying a restriction
    pub number: Color,
    pub text: Color,
    pub date: Color,
    pub boolean: Color,
    pub error: Color,
    pub warning: Color,
    pub success: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            highlight: Color::Yellow,
            filtered: Color::LightMagenta,
            number: Color::Cyan,
            text: Color::Green,
            date: Color::Yellow,
            boolean: Color::Magenta,
            error: Color::Red,
            warning: Color::LightYellow,
            success: Color::LightGreen,
        }
    }
    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            highlight: Color::Blue,
            filtered: Color::Magenta,
            number: Color::DarkGray,
            text: Color::Green,
            date: Color::Yellow,
            boolean: Color::Magenta,
            error: Color::Red,
            warning: Color::LightYellow,
            success: Color::Green,
        }
    }
    pub fn nord() -> Self {
        Self {
            bg: Color::Rgb(46, 52, 64),
            fg: Color::Rgb(216, 222, 233),
            highlight: Color::Rgb(136, 192, 208),
            filtered: Color::Rgb(180, 142, 173),
            number: Color::Rgb(129, 161, 193),
            text: Color::Rgb(163, 190, 140),
            date: Color::Rgb(235, 203, 139),
            boolean: Color::Rgb(180, 142, 173),
            error: Color::Rgb(191, 97, 106),
            warning: Color::Rgb(235, 203, 139),
            success: Color::Rgb(163, 190, 140),
        }
    }
    pub fn colorblind() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            highlight: Color::Yellow,
            filtered: Color::Rgb(0x00, 0x80, 0xFF),
            number: Color::Cyan,
            text: Color::Rgb(0x00, 0x80, 0xFF), // blue instead of green
            date: Color::Yellow,
            boolean: Color::Magenta,
            error: Color::Rgb(0xFF, 0x8C, 0x00), // orange instead of red
            warning: Color::LightYellow,
            success: Color::Rgb(0x00, 0x80, 0xFF),
        }
    }
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "nord" => Self::nord(),
            "colorblind" => Self::colorblind(),
            _ => Self::dark(),
        }
    }
    pub fn kind_color(&self, kind: FieldKind) -> Color {
        match kind {
            FieldKind::Number => self.number,
            FieldKind::Date => self.date,
            FieldKind::Boolean => self.boolean,
            FieldKind::Text | FieldKind::Enumerated => self.text,
        }
    }
}
