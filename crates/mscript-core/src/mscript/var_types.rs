//! Variable types of MethodSCRIPT values
//!
//! Each encoded value starts with a two-letter id naming what was measured.
//! The table below is the closed vocabulary; new kinds are added here.

use serde::Serialize;
use std::fmt;

/// Physical quantity a variable measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quantity {
    /// Cell or electrode potential
    Potential,
    /// Cell or electrode current
    Current,
    /// Elapsed time
    Time,
    /// Applied frequency
    Frequency,
    /// Impedance magnitude or component
    Impedance,
    /// Phase angle
    Phase,
    /// Temperature
    Temperature,
    /// Counters, channels and other dimensionless values
    Index,
    /// Reserved or undocumented ids
    Unknown,
}

/// Unit attached to a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    /// V
    Volt,
    /// V RMS
    VoltRms,
    /// A
    Ampere,
    /// A RMS
    AmpereRms,
    /// s
    Second,
    /// Hz
    Hertz,
    /// Ω
    Ohm,
    /// Angle in degrees
    Degree,
    /// °C
    Celsius,
    /// Counts, channels, masks
    None,
}

impl Unit {
    /// Printable symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::VoltRms => "Vrms",
            Unit::Ampere => "A",
            Unit::AmpereRms => "Arms",
            Unit::Second => "s",
            Unit::Hertz => "Hz",
            Unit::Ohm => "Ω",
            Unit::Degree => "°",
            Unit::Celsius => "°C",
            Unit::None => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One entry of the variable type table
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct VarType {
    /// Two-letter wire id
    pub id: &'static str,
    /// Descriptive name
    pub name: &'static str,
    /// What the value measures
    pub quantity: Quantity,
    /// Unit of the decoded value
    pub unit: Unit,
}

macro_rules! var_types {
    ($( $id:literal => $name:literal, $q:ident, $u:ident; )*) => {
        /// All known variable types
        pub static VAR_TYPES: &[VarType] = &[
            $( VarType { id: $id, name: $name, quantity: Quantity::$q, unit: Unit::$u }, )*
        ];
    };
}

var_types! {
    "aa" => "unknown", Unknown, None;
    "ab" => "WE vs RE potential", Potential, Volt;
    "ac" => "CE vs GND potential", Potential, Volt;
    "ad" => "SE vs GND potential", Potential, Volt;
    "ae" => "RE vs GND potential", Potential, Volt;
    "af" => "WE vs GND potential", Potential, Volt;
    "ag" => "WE vs CE potential", Potential, Volt;
    "as" => "AIN0 potential", Potential, Volt;
    "at" => "AIN1 potential", Potential, Volt;
    "au" => "AIN2 potential", Potential, Volt;
    "av" => "AIN3 potential", Potential, Volt;
    "aw" => "AIN4 potential", Potential, Volt;
    "ax" => "AIN5 potential", Potential, Volt;
    "ay" => "AIN6 potential", Potential, Volt;
    "az" => "AIN7 potential", Potential, Volt;
    "ba" => "WE current", Current, Ampere;
    "ca" => "Phase", Phase, Degree;
    "cb" => "Impedance", Impedance, Ohm;
    "cc" => "Z_real", Impedance, Ohm;
    "cd" => "Z_imag", Impedance, Ohm;
    "ce" => "EIS E TDD", Potential, Volt;
    "cf" => "EIS I TDD", Current, Ampere;
    "cg" => "EIS sampling frequency", Frequency, Hertz;
    "ch" => "EIS E AC", Potential, VoltRms;
    "ci" => "EIS E DC", Potential, Volt;
    "cj" => "EIS I AC", Current, AmpereRms;
    "ck" => "EIS I DC", Current, Ampere;
    "da" => "Applied potential", Potential, Volt;
    "db" => "Applied current", Current, Ampere;
    "dc" => "Applied frequency", Frequency, Hertz;
    "dd" => "Applied AC amplitude", Potential, VoltRms;
    "ea" => "Channel", Index, None;
    "eb" => "Time", Time, Second;
    "ec" => "Pin mask", Index, None;
    "ed" => "Temperature", Temperature, Celsius;
    "ee" => "Count", Index, None;
    "ha" => "Generic current 1", Current, Ampere;
    "hb" => "Generic current 2", Current, Ampere;
    "hc" => "Generic current 3", Current, Ampere;
    "hd" => "Generic current 4", Current, Ampere;
    "ia" => "Generic potential 1", Potential, Volt;
    "ib" => "Generic potential 2", Potential, Volt;
    "ic" => "Generic potential 3", Potential, Volt;
    "id" => "Generic potential 4", Potential, Volt;
    "ja" => "Misc. generic 1", Unknown, None;
    "jb" => "Misc. generic 2", Unknown, None;
    "jc" => "Misc. generic 3", Unknown, None;
    "jd" => "Misc. generic 4", Unknown, None;
}

impl VarType {
    /// Find the table entry for a two-letter id
    pub fn lookup(id: &str) -> Option<&'static VarType> {
        VAR_TYPES.iter().find(|v| v.id == id)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
