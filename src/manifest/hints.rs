//! Hints attached to manifest diagnostics, keyed by an error message fragment.

pub(crate) const YAML_HINTS: [(&str, &str); 5] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "expected ':'",
        "Ensure each key is followed by ':' separating key and value.",
    ),
    (
        "mapping values are not allowed",
        "Check for a stray ':' or add quotes around values where needed.",
    ),
    (
        "found character that cannot start any token",
        "Remove stray characters and ensure indentation uses spaces (no tabs).",
    ),
    (
        "unknown escape character",
        "Use valid YAML escape sequences or quote the string.",
    ),
];

pub(crate) const SCHEMA_HINTS: [(&str, &str); 4] = [
    (
        "unknown variant",
        "Each node is a single-key map: custom, release, setup, alias or conform.",
    ),
    (
        "unknown field",
        "Check the spelling of the key; unknown keys are rejected.",
    ),
    (
        "missing field `kiln_version`",
        "Start the manifest with `kiln_version: \"1.0.0\"`.",
    ),
    (
        "mutually exclusive",
        "Split the stage step so each entry has exactly one of arg, script or copy.",
    ),
];

/// First hint whose fragment appears in `message`, compared case-insensitively.
pub(crate) fn find(table: &[(&str, &'static str)], message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    table
        .iter()
        .find(|(needle, _)| lower.contains(&needle.to_lowercase()))
        .map(|(_, hint)| *hint)
}
