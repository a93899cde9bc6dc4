/// Longest name a header title holds.
pub const ROMNAME_LEN: usize = 12;

/// Drops directories and everything from the first dot, keeping at most 12 characters.
pub fn filename_to_romname(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    let stem = base.split('.').next().unwrap_or(base);
    stem.chars().take(ROMNAME_LEN).collect()
}
