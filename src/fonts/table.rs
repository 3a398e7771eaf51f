//! Family name → file name table for the fonts shipped in `FONTS_DIR`.

pub const FAMILY_TABLE: &[(&str, &str)] = &[
    ("Arial", "arial.ttf"),
    ("Anton", "Anton-Regular.ttf"),
    ("Poppins", "Poppins-Regular.ttf"),
    ("Great Vibes", "GreatVibes-Regular.ttf"),
    ("Alex Brush", "AlexBrush-Regular.ttf"),
    ("Allura", "Allura-Regular.ttf"),
    ("Pacifico", "Pacifico-Regular.ttf"),
    ("Montserrat", "Montserrat-Regular.ttf"),
    ("Playfair Display", "PlayfairDisplay-Regular.ttf"),
    ("Bree Serif", "BreeSerif-Regular.ttf"),
    ("Tourney", "Tourney-Regular.ttf"),
];

/// Case-insensitive lookup.
pub fn lookup(family: &str) -> Option<&'static str> {
    let family = family.trim();
    FAMILY_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(family))
        .map(|(_, file)| *file)
}

pub fn families() -> impl Iterator<Item = &'static str> {
    FAMILY_TABLE.iter().map(|(name, _)| *name)
}
