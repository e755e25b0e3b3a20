use serde::{Deserialize, Serialize};

/// How contention on a resource is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClass {
    /// Two requests racing for the same resource; resolved by priority.
    #[default]
    Timing,
    /// Exclusive access; a second owner is always rejected.
    HardAccess,
}

/// A resource a run must own while it is queued and running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub id: String,
    #[serde(default)]
    pub class: ConflictClass,
}

impl ResourceRequirement {
    pub fn timing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: ConflictClass::Timing,
        }
    }

    pub fn hard_access(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: ConflictClass::HardAccess,
        }
    }
}

/// What happens to the run when a beat's handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    Continue,
    #[default]
    Abort,
}

/// When a beat may be dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimingMode {
    #[default]
    Immediate,
    /// Requires an earlier beat of the same run (by event name) to have completed.
    AfterDependency { dependency: String },
    Delayed { delay_ms: u64 },
    WaitForSignal {
        signal: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDefinition {
    #[serde(alias = "stepNumber", alias = "step")]
    pub step_number: u32,
    #[serde(alias = "eventName", alias = "event")]
    pub event_name: String,
    /// Handler lookup key; the event name when absent.
    #[serde(default, alias = "handlerName", alias = "handler")]
    pub handler_name: Option<String>,
    /// Relative weight of the beat, surfaced in notifications.
    #[serde(default)]
    pub dynamics: u8,
    #[serde(default, alias = "timingMode")]
    pub timing: TimingMode,
    #[serde(default, alias = "errorPolicy")]
    pub error_policy: ErrorPolicy,
}

impl BeatDefinition {
    pub fn new(step_number: u32, event_name: impl Into<String>) -> Self {
        Self {
            step_number,
            event_name: event_name.into(),
            handler_name: None,
            dynamics: 0,
            timing: TimingMode::Immediate,
            error_policy: ErrorPolicy::Abort,
        }
    }

    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handler_name = Some(name.into());
        self
    }

    pub fn timing(mut self, timing: TimingMode) -> Self {
        self.timing = timing;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn dynamics(mut self, dynamics: u8) -> Self {
        self.dynamics = dynamics;
        self
    }

    pub fn handler_key(&self) -> &str {
        self.handler_name.as_deref().unwrap_or(&self.event_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementDefinition {
    pub name: String,
    #[serde(default)]
    pub beats: Vec<BeatDefinition>,
}

impl MovementDefinition {
    pub fn new(name: impl Into<String>, beats: Vec<BeatDefinition>) -> Self {
        Self {
            name: name.into(),
            beats,
        }
    }
}

/// A named, ordered unit of orchestrated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub movements: Vec<MovementDefinition>,
    #[serde(default)]
    pub resources: Vec<ResourceRequirement>,
}

impl SequenceDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            movements: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn movement(mut self, movement: MovementDefinition) -> Self {
        self.movements.push(movement);
        self
    }

    pub fn resource(mut self, requirement: ResourceRequirement) -> Self {
        self.resources.push(requirement);
        self
    }

    pub fn beat_count(&self) -> usize {
        self.movements.iter().map(|m| m.beats.len()).sum()
    }

    /// Sort every movement's beats by step number. The sort is stable, so
    /// beats sharing a step keep their declaration order.
    pub fn normalize(&mut self) {
        for movement in &mut self.movements {
            movement.beats.sort_by_key(|beat| beat.step_number);
        }
        if self.name.is_empty() {
            self.name = self.id.clone();
        }
    }

    /// Fold another contribution into this definition. Movements with the
    /// same name merge, and a beat already present with the same step and
    /// event is skipped. Resources are deduplicated by id.
    pub fn augment(&mut self, other: SequenceDefinition) {
        for movement in other.movements {
            match self.movements.iter_mut().find(|m| m.name == movement.name) {
                Some(existing) => {
                    for beat in movement.beats {
                        let known = existing.beats.iter().any(|b| {
                            b.step_number == beat.step_number && b.event_name == beat.event_name
                        });
                        if !known {
                            existing.beats.push(beat);
                        }
                    }
                }
                None => self.movements.push(movement),
            }
        }
        for requirement in other.resources {
            if !self.resources.iter().any(|r| r.id == requirement.id) {
                self.resources.push(requirement);
            }
        }
        self.normalize();
    }
}
