//! # Dynamic Verifier
//!
//! Exercises the compiled artifact the way a user of the generated types would:
//! construct an instance, call its `set_<field>` mutators with literal values,
//! and render the result.
//!
//! The artifact runs as an isolated child process driven through the line
//! protocol in [`crate::protocol`]. Which mutators exist, and what they accept, is
//! read from the registry written at compile time, so a probe whose literal does
//! not fit a mutator is skipped before anything is sent.
//!
//! Verification never fails as a call: every problem is recorded on the affected
//! [`TypeOutcome`].

use crate::cancel::CancelToken;
use crate::compiler::artifact_binary;
use crate::error::AppError;
use crate::manifest::Registry;
use crate::model::ParamKind;
use crate::protocol::{Request, Response};
use crate::toolchain::{CommandExecutor, Invocation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A literal a probe passes to a mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeValue {
    /// Passed to `bool` mutators.
    Bool(bool),
    /// Passed to `i64` mutators.
    Int(i64),
    /// Passed to `String` mutators.
    Str(String),
}

impl ProbeValue {
    /// The parameter kind this literal fits.
    pub fn kind(&self) -> ParamKind {
        match self {
            ProbeValue::Bool(_) => ParamKind::Boolean,
            ProbeValue::Int(_) => ParamKind::Integer,
            ProbeValue::Str(_) => ParamKind::String,
        }
    }

    fn literal(&self) -> String {
        match self {
            ProbeValue::Bool(b) => b.to_string(),
            ProbeValue::Int(i) => i.to_string(),
            ProbeValue::Str(s) => s.clone(),
        }
    }
}

impl From<&str> for ProbeValue {
    fn from(value: &str) -> Self {
        ProbeValue::Str(value.to_string())
    }
}

impl From<i64> for ProbeValue {
    fn from(value: i64) -> Self {
        ProbeValue::Int(value)
    }
}

impl From<bool> for ProbeValue {
    fn from(value: bool) -> Self {
        ProbeValue::Bool(value)
    }
}

/// Values to apply to one type, keyed by schema property name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeProbe {
    /// Qualified or simple type name.
    pub type_name: String,
    /// Property name to literal, applied in order.
    #[serde(default)]
    pub values: IndexMap<String, ProbeValue>,
}

impl TypeProbe {
    /// A probe of `type_name` with the given values.
    pub fn new<V: Into<ProbeValue>>(
        type_name: impl Into<String>,
        values: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        }
    }
}

/// The types and values a verification run exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    /// Probes in execution order.
    #[serde(default)]
    pub types: Vec<TypeProbe>,
}

impl Default for ProbeSpec {
    fn default() -> Self {
        Self {
            types: vec![
                TypeProbe {
                    type_name: "Employee".into(),
                    values: IndexMap::from([
                        ("name".to_string(), ProbeValue::from("Manas")),
                        ("age".to_string(), ProbeValue::from(19)),
                    ]),
                },
                TypeProbe {
                    type_name: "Person".into(),
                    values: IndexMap::from([
                        ("name".to_string(), ProbeValue::from("Person1")),
                        ("age".to_string(), ProbeValue::from(23)),
                    ]),
                },
            ],
        }
    }
}

/// A probe value that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProbe {
    /// Property name of the probe.
    pub field: String,
    /// Why it was skipped.
    pub reason: String,
}

/// What happened to one probed type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeOutcome {
    /// Requested type name.
    pub type_name: String,
    /// Found in the artifact.
    pub loaded: bool,
    /// An instance was constructed.
    pub constructed: bool,
    /// Mutators invoked successfully, in order.
    pub applied: Vec<String>,
    /// Probe values not applied.
    pub skipped: Vec<SkippedProbe>,
    /// First failure, if any.
    pub error: Option<String>,
    /// Debug rendering of the instance after all mutators ran.
    pub rendered: Option<String>,
}

impl TypeOutcome {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }
}

/// Result of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// One entry per probe, in probe order.
    pub types: Vec<TypeOutcome>,
}

impl VerificationOutcome {
    /// Looks up the outcome of `type_name`.
    pub fn get(&self, type_name: &str) -> Option<&TypeOutcome> {
        self.types.iter().find(|t| t.type_name == type_name)
    }
}

/// What a sent request is for, so its response can be attributed.
enum Step {
    New,
    Set { setter: String, field: String },
    Show,
}

/// Drives compiled artifacts through a [`CommandExecutor`].
#[derive(Debug, Clone)]
pub struct DynamicVerifier<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> DynamicVerifier<E> {
    /// A verifier running artifacts with `executor`.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Verifies every probe of `probes` against the artifact in `artifact_dir`.
    pub fn verify(
        &self,
        artifact_dir: &Path,
        probes: &ProbeSpec,
        cancel: &CancelToken,
    ) -> VerificationOutcome {
        let mut outcome = VerificationOutcome {
            types: probes
                .types
                .iter()
                .map(|p| TypeOutcome::new(&p.type_name))
                .collect(),
        };
        if probes.types.is_empty() {
            return outcome;
        }

        let binary = artifact_binary(artifact_dir);
        if !binary.is_file() {
            fail_all(&mut outcome, &format!("no artifact at {}", binary.display()));
            return outcome;
        }
        let registry = match Registry::load(artifact_dir) {
            Ok(r) => r,
            Err(e) => {
                fail_all(&mut outcome, &e.to_string());
                return outcome;
            }
        };

        let mut script = String::new();
        let mut plan: Vec<(usize, Step)> = Vec::new();
        for (index, probe) in probes.types.iter().enumerate() {
            let result = &mut outcome.types[index];
            let entry = match registry.resolve(&probe.type_name) {
                Ok(entry) => entry,
                Err(reason) => {
                    result.fail(reason);
                    continue;
                }
            };
            result.loaded = true;

            push(&mut script, &Request::New(entry.qualified_name.clone()));
            plan.push((index, Step::New));

            for (field, value) in &probe.values {
                let Some(mutator) = entry.mutators.iter().find(|m| &m.field == field) else {
                    result.skipped.push(SkippedProbe {
                        field: field.clone(),
                        reason: format!("no mutator for '{}'", field),
                    });
                    continue;
                };
                if mutator.kind != value.kind() {
                    result.skipped.push(SkippedProbe {
                        field: field.clone(),
                        reason: format!(
                            "{} takes {}, probe value is {}",
                            mutator.setter,
                            mutator.kind,
                            value.kind()
                        ),
                    });
                    continue;
                }
                push(
                    &mut script,
                    &Request::Set {
                        field: field.clone(),
                        kind: value.kind(),
                        value: value.literal(),
                    },
                );
                plan.push((
                    index,
                    Step::Set {
                        setter: mutator.setter.clone(),
                        field: field.clone(),
                    },
                ));
            }

            push(&mut script, &Request::Show);
            plan.push((index, Step::Show));
        }

        if plan.is_empty() {
            return outcome;
        }

        let invocation = Invocation::new(&binary).stdin(script);
        let output = match self.executor.execute(&invocation, cancel) {
            Ok(output) => output,
            Err(e) => {
                let message = match e {
                    AppError::Cancelled(reason) => format!("verification cancelled: {}", reason),
                    other => other.to_string(),
                };
                for (index, _) in &plan {
                    outcome.types[*index].fail(message.clone());
                }
                return outcome;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut responses = stdout.lines();
        for (index, step) in &plan {
            let result = &mut outcome.types[*index];
            let response = match responses.next().map(Response::decode) {
                Some(Ok(response)) => response,
                Some(Err(violation)) => {
                    result.fail(violation);
                    continue;
                }
                None => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    result.fail(format!(
                        "artifact stopped responding ({}): {}",
                        output.status,
                        stderr.trim()
                    ));
                    continue;
                }
            };
            match (step, response) {
                (Step::New, Response::Ok(_)) => result.constructed = true,
                (Step::New, Response::Err(message)) => {
                    result.fail(format!("construction failed: {}", message))
                }
                (_, _) if !result.constructed => {}
                (Step::Set { setter, .. }, Response::Ok(_)) => result.applied.push(setter.clone()),
                (Step::Set { setter, field }, Response::Err(message)) => {
                    result.skipped.push(SkippedProbe {
                        field: field.clone(),
                        reason: format!("{} failed: {}", setter, message),
                    })
                }
                (Step::Show, Response::Ok(rendered)) => result.rendered = rendered,
                (Step::Show, Response::Err(message)) => result.fail(message),
            }
        }

        for result in &outcome.types {
            match &result.error {
                None => tracing::info!(
                    "Verified {}: applied [{}], skipped {}",
                    result.type_name,
                    result.applied.join(", "),
                    result.skipped.len()
                ),
                Some(error) => tracing::warn!("Verification of {} failed: {}", result.type_name, error),
            }
        }
        outcome
    }
}

fn push(script: &mut String, request: &Request) {
    script.push_str(&request.encode());
    script.push('\n');
}

fn fail_all(outcome: &mut VerificationOutcome, message: &str) {
    tracing::warn!("Verification skipped: {}", message);
    for result in &mut outcome.types {
        result.fail(message);
    }
}
