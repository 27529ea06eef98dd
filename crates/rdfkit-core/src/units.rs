//! # Physical Units
//!
//! Space and time axes may declare a unit. The known vocabulary follows the
//! OME-NGFF unit lists. A unit outside these lists is still accepted; the
//! axis parser emits an advisory warning for it.

/// Units recognized for space axes.
pub const SPACE_UNITS: &[&str] = &[
    "attometer",
    "angstrom",
    "centimeter",
    "decimeter",
    "exameter",
    "femtometer",
    "foot",
    "gigameter",
    "hectometer",
    "inch",
    "kilometer",
    "megameter",
    "meter",
    "micrometer",
    "mile",
    "millimeter",
    "nanometer",
    "parsec",
    "petameter",
    "picometer",
    "terameter",
    "yard",
    "yoctometer",
    "yottameter",
    "zeptometer",
    "zettameter",
];

/// Units recognized for time axes.
pub const TIME_UNITS: &[&str] = &[
    "attosecond",
    "centisecond",
    "day",
    "decisecond",
    "exasecond",
    "femtosecond",
    "gigasecond",
    "hectosecond",
    "hour",
    "kilosecond",
    "megasecond",
    "microsecond",
    "millisecond",
    "minute",
    "nanosecond",
    "petasecond",
    "picosecond",
    "second",
    "terasecond",
    "yoctosecond",
    "yottasecond",
    "zeptosecond",
    "zettasecond",
];

/// Whether `unit` is a known space unit.
pub fn is_space_unit(unit: &str) -> bool {
    SPACE_UNITS.contains(&unit)
}

/// Whether `unit` is a known time unit.
pub fn is_time_unit(unit: &str) -> bool {
    TIME_UNITS.contains(&unit)
}
