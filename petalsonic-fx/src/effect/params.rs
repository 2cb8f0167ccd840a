//! Typed parameter tables addressed by integer index

use crate::error::{PetalSonicFxError, Result};
use crate::math::Attributes3d;

/// Type, range and default of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Bool { default: bool },
    Int { min: i32, max: i32, default: i32 },
    Float { min: f32, max: f32, default: f32 },
    /// 3D position and orientation written by the host; defaults to identity.
    Attributes3d,
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool { .. } => "bool",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Attributes3d => "3d attributes",
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match *self {
            Self::Bool { default } => ParamValue::Bool(default),
            Self::Int { default, .. } => ParamValue::Int(default),
            Self::Float { default, .. } => ParamValue::Float(default),
            Self::Attributes3d => ParamValue::Attributes3d(Attributes3d::IDENTITY),
        }
    }

    /// Clamps `value` into range, or returns `None` if its type does not match.
    /// Non-finite floats are rejected.
    fn accept(&self, value: ParamValue) -> Option<ParamValue> {
        match (*self, value) {
            (Self::Bool { .. }, ParamValue::Bool(v)) => Some(ParamValue::Bool(v)),
            (Self::Int { min, max, .. }, ParamValue::Int(v)) => {
                Some(ParamValue::Int(v.clamp(min, max)))
            }
            (Self::Float { min, max, .. }, ParamValue::Float(v)) if v.is_finite() => {
                Some(ParamValue::Float(v.clamp(min, max)))
            }
            (Self::Attributes3d, ParamValue::Attributes3d(v)) => {
                Some(ParamValue::Attributes3d(v))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDesc {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Attributes3d(Attributes3d),
}

/// Current values of one effect instance's parameters.
#[derive(Debug, Clone)]
pub struct ParamTable {
    descs: &'static [ParamDesc],
    values: Vec<ParamValue>,
}

impl ParamTable {
    pub fn new(descs: &'static [ParamDesc]) -> Self {
        Self {
            descs,
            values: descs.iter().map(|d| d.kind.default_value()).collect(),
        }
    }

    /// Restores every parameter to its default.
    pub fn reset(&mut self) {
        for (value, desc) in self.values.iter_mut().zip(self.descs) {
            *value = desc.kind.default_value();
        }
    }

    pub fn descs(&self) -> &'static [ParamDesc] {
        self.descs
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<ParamValue> {
        self.values
            .get(index)
            .copied()
            .ok_or(PetalSonicFxError::InvalidParameter { index })
    }

    /// Stores `value`, clamped to the parameter's range.
    ///
    /// An unknown index or a value of the wrong type is rejected and leaves
    /// the table unchanged.
    pub fn set(&mut self, index: usize, value: ParamValue) -> Result<()> {
        let desc = self
            .descs
            .get(index)
            .ok_or(PetalSonicFxError::InvalidParameter { index })?;
        let accepted = desc
            .kind
            .accept(value)
            .ok_or(PetalSonicFxError::ParameterType {
                index,
                expected: desc.kind.type_name(),
            })?;
        self.values[index] = accepted;
        Ok(())
    }

    pub fn get_bool(&self, index: usize) -> Result<bool> {
        match self.get(index)? {
            ParamValue::Bool(v) => Ok(v),
            _ => Err(self.type_error(index)),
        }
    }

    pub fn get_int(&self, index: usize) -> Result<i32> {
        match self.get(index)? {
            ParamValue::Int(v) => Ok(v),
            _ => Err(self.type_error(index)),
        }
    }

    pub fn get_float(&self, index: usize) -> Result<f32> {
        match self.get(index)? {
            ParamValue::Float(v) => Ok(v),
            _ => Err(self.type_error(index)),
        }
    }

    pub fn get_attributes(&self, index: usize) -> Result<Attributes3d> {
        match self.get(index)? {
            ParamValue::Attributes3d(v) => Ok(v),
            _ => Err(self.type_error(index)),
        }
    }

    fn type_error(&self, index: usize) -> PetalSonicFxError {
        PetalSonicFxError::ParameterType {
            index,
            expected: self.descs[index].kind.type_name(),
        }
    }

    // Infallible reads for the audio thread, which only uses indices from the
    // effect's own table.

    pub(crate) fn flag(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(ParamValue::Bool(true)))
    }

    pub(crate) fn int(&self, index: usize) -> i32 {
        match self.values.get(index) {
            Some(ParamValue::Int(v)) => *v,
            _ => 0,
        }
    }

    pub(crate) fn float(&self, index: usize) -> f32 {
        match self.values.get(index) {
            Some(ParamValue::Float(v)) => *v,
            _ => 0.0,
        }
    }

    pub(crate) fn attributes(&self, index: usize) -> Attributes3d {
        match self.values.get(index) {
            Some(ParamValue::Attributes3d(v)) => *v,
            _ => Attributes3d::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    const TABLE: &[ParamDesc] = &[
        ParamDesc {
            name: "Enabled",
            description: "Toggle",
            kind: ParamKind::Bool { default: true },
        },
        ParamDesc {
            name: "Level",
            description: "Gain",
            kind: ParamKind::Float {
                min: 0.0,
                max: 1.0,
                default: 0.5,
            },
        },
        ParamDesc {
            name: "Handle",
            description: "Source",
            kind: ParamKind::Int {
                min: -1,
                max: 100,
                default: -1,
            },
        },
        ParamDesc {
            name: "Position",
            description: "Emitter",
            kind: ParamKind::Attributes3d,
        },
    ];

    #[test]
    fn test_defaults() {
        let table = ParamTable::new(TABLE);
        assert_eq!(table.len(), 4);
        assert!(table.get_bool(0).unwrap());
        assert_eq!(table.get_float(1).unwrap(), 0.5);
        assert_eq!(table.get_int(2).unwrap(), -1);
        assert_eq!(table.get_attributes(3).unwrap(), Attributes3d::IDENTITY);
    }

    #[test]
    fn test_unknown_index_is_rejected() {
        let mut table = ParamTable::new(TABLE);
        assert!(matches!(
            table.get(4),
            Err(PetalSonicFxError::InvalidParameter { index: 4 })
        ));
        assert!(matches!(
            table.set(7, ParamValue::Bool(false)),
            Err(PetalSonicFxError::InvalidParameter { index: 7 })
        ));
    }

    #[test]
    fn test_wrong_type_leaves_value_unchanged() {
        let mut table = ParamTable::new(TABLE);
        assert!(matches!(
            table.set(0, ParamValue::Float(0.0)),
            Err(PetalSonicFxError::ParameterType { index: 0, .. })
        ));
        assert!(table.get_bool(0).unwrap());
        assert!(table.get_float(0).is_err());
    }

    #[test]
    fn test_values_are_clamped() {
        let mut table = ParamTable::new(TABLE);
        table.set(1, ParamValue::Float(3.0)).unwrap();
        assert_eq!(table.get_float(1).unwrap(), 1.0);
        table.set(2, ParamValue::Int(-20)).unwrap();
        assert_eq!(table.get_int(2).unwrap(), -1);
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let mut table = ParamTable::new(TABLE);
        table.set(1, ParamValue::Float(0.25)).unwrap();
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                table.set(1, ParamValue::Float(value)),
                Err(PetalSonicFxError::ParameterType { index: 1, .. })
            ));
        }
        assert_eq!(table.get_float(1).unwrap(), 0.25);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut table = ParamTable::new(TABLE);
        table.set(0, ParamValue::Bool(false)).unwrap();
        table
            .set(
                3,
                ParamValue::Attributes3d(Attributes3d::from_position(Vec3::X)),
            )
            .unwrap();
        table.reset();
        assert!(table.flag(0));
        assert_eq!(table.attributes(3), Attributes3d::IDENTITY);
    }
}
