//! Built-in custom function scripts.

pub(super) const SCRIPTS: &[(&str, &str)] = &[
    // YYYYMMDD -> YYYY-MM-DD
    (
        "date_standardized",
        "{%slice($0, 0, 4)}-{%slice($0, 4, 6)}-{%slice($0, 6, 8)}",
    ),
    ("default_if_empty", "{%if_passthrough($0, $1)}"),
    // $0 as an integer when it looks like one, otherwise $1
    (
        "int_or_default",
        r#"{%if(%regex_search(%string($0), "^\s*-?\d{1,15}(\.\d+)?\s*$"), %int($0), $1)}"#,
    ),
    // $0 when it is a YYYYMMDD date, otherwise $1
    (
        "date_or_default",
        r#"{%if(%regex_search(%string($0), "^\d{8}$"), %string($0), $1)}"#,
    ),
    ("season_episode", "S{%pad_zero($0, 2)}E{%pad_zero($1, 2)}"),
];
