//! Service health dot.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Service answered.
    Green,
    /// Probe in flight.
    Orange,
    /// Service unreachable or failing.
    Red,
    /// Not probed yet.
    Gray,
}

impl Indicator {
    pub fn from_health(healthy: bool) -> Self {
        if healthy {
            Indicator::Green
        } else {
            Indicator::Red
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Indicator::Green => (0x16, 0xa3, 0x4a),
            Indicator::Orange => (0xf5, 0x9e, 0x0b),
            Indicator::Red => (0xef, 0x44, 0x44),
            Indicator::Gray => (0x9c, 0xa3, 0xaf),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Indicator::Green => "green",
            Indicator::Orange => "orange",
            Indicator::Red => "red",
            Indicator::Gray => "gray",
        }
    }

    /// Coloured dot followed by the state name, for a truecolor terminal.
    pub fn render(self) -> String {
        let (r, g, b) = self.rgb();
        format!("\x1b[38;2;{r};{g};{b}m\u{25cf}\x1b[0m {}", self.name())
    }
}
