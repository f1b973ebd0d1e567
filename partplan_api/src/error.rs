use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use serde::{ser::SerializeStruct, Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::config::LayoutValidationError;

/// User provided input was invalid.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidInputError {
    #[error("Failed to read input file '{path}'")]
    ReadInputFile { path: String },
    #[error("Failed to parse provisioning data")]
    ParseProvisioningData,
    #[error("Failed to parse discovered devices")]
    ParseDiscoveredDevices,
    #[error("Failed to parse image catalog")]
    ParseImageCatalog,
    #[error("Failed to parse planner configuration")]
    ParsePlannerConfig,
    #[error("Planner configuration field '{field}' must be positive, got {value}")]
    InvalidPlannerConfig { field: String, value: i64 },
    #[error("Invalid desired layout: {0}")]
    InvalidLayout(#[from] LayoutValidationError),
}

/// The desired layout is well formed but cannot be planned against the
/// discovered hardware.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum PlanningError {
    #[error("Disk not found: {disk}")]
    DiskNotFound { disk: String },

    #[error(
        "Disks '{disk1}' and '{disk2}' resolve to the same device '{device}', but must be unique"
    )]
    DiskResolvedTwice {
        disk1: String,
        disk2: String,
        device: String,
    },

    #[error("Expected exactly one interface with MAC address '{mac}', found {matches}")]
    AmbiguousInterface { mac: String, matches: usize },

    #[error("Physical volume '{device}' references undeclared volume group '{vg}'")]
    UndeclaredVolumeGroup { device: String, vg: String },

    #[error("Journal volume on disk '{disk}' requires journal devices, but none are declared for {osds} OSD(s)")]
    NoJournalDevices { disk: String, osds: usize },
}

#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),

    #[error("Device '{device}' was assigned a filesystem more than once")]
    DuplicateFilesystemDevice { device: String },

    #[error("Failed to serialize plan")]
    SerializePlan,

    #[error("Failed to write output file '{path}'")]
    WriteOutput { path: String },

    #[error("Planner panicked: {0}")]
    Panic(String),
}

/// Each variant of `ErrorKind` corresponds to a different category of error.
/// The categories tell the operator whether the input or the hardware needs
/// fixing, or whether the planner itself is at fault.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The planner was given invalid input.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// The input could not be mapped onto the node's hardware.
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// A bug was encountered. This indicates a problem with the planner.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct PlanErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct PlanError(Box<PlanErrorInner>);
impl PlanError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        PlanError(Box::new(PlanErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn internal(message: &'static str) -> Self {
        Self::new(InternalError::Internal(message))
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured PlanError.
    fn structured(self, kind: K) -> Result<T, PlanError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, PlanError> {
        match self {
            Some(t) => Ok(t),
            None => Err(PlanError(Box::new(PlanErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: None,
                context: Vec::new(),
            }))),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, PlanError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(PlanError(Box::new(PlanErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: Some(e.into()),
                context: Vec::new(),
            }))),
        }
    }
}

pub trait PlanResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, PlanError>;
}
impl<T> PlanResultExt<T> for Result<T, PlanError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, PlanError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }
}

impl Serialize for PlanError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("plan-error", 5)?;
        state.serialize_field("message", &self.0.kind.to_string())?;
        match self.0.kind {
            ErrorKind::InvalidInput(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Planning(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Internal(ref e) => state.serialize_field("error", e)?,
        }
        state.serialize_field("category", <&str>::from(&self.0.kind))?;
        state.serialize_field(
            "location",
            &format!("{}:{}", self.0.location.file(), self.0.location.line()),
        )?;
        match self.0.source {
            Some(ref e) => state.serialize_field("cause", &Some(format!("{:?}", e)))?,
            None => state.serialize_field("cause", &None::<String>)?,
        }
        state.end()
    }
}

impl Debug for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                for (j, line) in context.split('\n').enumerate() {
                    if j == 0 {
                        write!(f, "{: >5}: ", i)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut index = 0;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use serde_yaml::Value;

    use super::*;

    #[test]
    fn test_error_serialize() {
        let e = PlanError(Box::new(PlanErrorInner {
            kind: ErrorKind::Planning(PlanningError::DiskNotFound { disk: "sdb".into() }),
            location: Location::caller(),
            source: Some(
                std::fs::read("/non-existant-file")
                    .context("failed to read file")
                    .unwrap_err(),
            ),
            context: Vec::new(),
        }));
        match serde_yaml::to_value(e).unwrap() {
            Value::Mapping(m) => {
                assert_eq!(m.len(), 5);
                match m["error"] {
                    Value::Tagged(ref tagged) => {
                        assert_eq!(tagged.tag, "disk-not-found");
                        assert_eq!(tagged.value["disk"], Value::String("sdb".into()));
                    }
                    _ => panic!("error isn't tagged"),
                }
                assert_eq!(m["category"], Value::String("planning".into()));
                assert!(matches!(m["cause"], Value::String(_)));
                assert_eq!(m["message"], Value::String("Disk not found: sdb".into()));
                match m["location"] {
                    Value::String(ref s) => assert!(s.contains("error.rs:")),
                    _ => panic!("location isn't string"),
                }
            }
            _ => panic!("value isn't mapping"),
        }
    }

    #[test]
    fn test_error_serialize_unit_variant() {
        let e = PlanError::new(InternalError::SerializePlan);
        let value = serde_yaml::to_value(e).unwrap();
        assert_eq!(value["error"], Value::String("serialize-plan".into()));
        assert_eq!(value["category"], Value::String("internal".into()));
        assert_eq!(value["cause"], Value::Null);
    }

    #[test]
    fn test_error_debug() {
        let error = Err::<(), _>(anyhow::anyhow!("z"))
            .context("x\ny")
            .structured(InternalError::Internal("w"))
            .unwrap_err();
        assert_eq!(
            format!("{:?}", error),
            format!(
                "Internal error: w at {}:{}\n\nCaused by:\n    0: x\n       y\n    1: z\n",
                error.0.location.file(),
                error.0.location.line(),
            ),
        );
    }

    #[test]
    fn test_error_message_context() {
        let error = Err::<(), _>(PlanError::new(PlanningError::DiskNotFound {
            disk: "sda".into(),
        }))
        .message("Failed to build partition plan")
        .unwrap_err();
        let rendered = format!("{error:?}");
        assert!(rendered.starts_with("Disk not found: sda at "));
        assert!(rendered.contains("Context:\n    0: Failed to build partition plan at "));
        assert_eq!(
            error.kind(),
            &ErrorKind::Planning(PlanningError::DiskNotFound { disk: "sda".into() })
        );
    }

    #[test]
    fn test_option_structured() {
        let error = None::<u32>
            .structured(PlanningError::AmbiguousInterface {
                mac: "aa:bb".into(),
                matches: 0,
            })
            .unwrap_err();
        assert_eq!(
            error.kind().to_string(),
            "Expected exactly one interface with MAC address 'aa:bb', found 0"
        );
    }
}
