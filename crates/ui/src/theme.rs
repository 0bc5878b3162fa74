use ember_protocol::ThemeToken;

/// Resolved RGBA color for egui rendering.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ResolvedColor {
    const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    pub fn visuals(self) -> egui::Visuals {
        match self {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        }
    }
}

pub fn resolve(token: ThemeToken, mode: ThemeMode) -> egui::Color32 {
    match mode {
        ThemeMode::Dark => resolve_dark(token),
        ThemeMode::Light => resolve_light(token),
    }
    .to_color32()
}

fn resolve_dark(token: ThemeToken) -> ResolvedColor {
    // Catppuccin Mocha palette
    use ThemeToken::*;
    match token {
        NodeLabel => ResolvedColor::rgb(0x1a, 0x1a, 0x1a),
        SelectionOutline => ResolvedColor::rgb(0x89, 0xb4, 0xfa), // Blue

        TextPrimary => ResolvedColor::rgb(0xcd, 0xd6, 0xf4), // Text
        TextMuted => ResolvedColor::rgb(0xa6, 0xad, 0xc8),   // Subtext0

        Background => ResolvedColor::rgb(0x11, 0x11, 0x1b), // Crust
        Surface => ResolvedColor::rgb(0x18, 0x18, 0x25),    // Mantle
        Border => ResolvedColor::rgb(0x31, 0x32, 0x44),     // Surface0

        ToolbarBackground => ResolvedColor::rgb(0x18, 0x18, 0x25),
        ToolbarText => ResolvedColor::rgb(0xcd, 0xd6, 0xf4),

        TagBackground => ResolvedColor::rgb(0x45, 0x47, 0x5a), // Surface1
        TagText => ResolvedColor::rgb(0xcd, 0xd6, 0xf4),
        TooltipBackground => ResolvedColor::rgb(0x1e, 0x1e, 0x2e), // Base
        TooltipBorder => ResolvedColor::rgb(0x58, 0x5b, 0x70),     // Surface2
    }
}

fn resolve_light(token: ThemeToken) -> ResolvedColor {
    use ThemeToken::*;
    match token {
        NodeLabel => ResolvedColor::rgb(26, 26, 26),
        SelectionOutline => ResolvedColor::rgb(50, 110, 220),

        TextPrimary => ResolvedColor::rgb(20, 20, 30),
        TextMuted => ResolvedColor::rgb(100, 100, 110),

        Background => ResolvedColor::rgb(255, 255, 255),
        Surface => ResolvedColor::rgb(245, 245, 248),
        Border => ResolvedColor::rgb(210, 210, 220),

        ToolbarBackground => ResolvedColor::rgb(248, 248, 250),
        ToolbarText => ResolvedColor::rgb(40, 40, 50),

        TagBackground => ResolvedColor::rgb(225, 235, 250),
        TagText => ResolvedColor::rgb(30, 60, 120),
        TooltipBackground => ResolvedColor::rgb(255, 255, 255),
        TooltipBorder => ResolvedColor::rgb(190, 190, 200),
    }
}
