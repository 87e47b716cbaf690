//! Widget bootstrap: validate the organization, resolve the persisted contact
//! session, then route to exactly one screen.
//!
//! `BootstrapMachine` is a pure state machine: `advance(event)` returns the
//! effects to perform. `BootstrapController` drives it against a backend and
//! a `SessionStore`. Each start bumps a generation counter; results issued
//! under an older generation are dropped, so changing the organization
//! mid-flight cancels the previous run.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::WidgetBackend;
use crate::screen::Screen;
use crate::storage::SessionStore;

pub const MSG_FINDING_ORGANIZATION: &str = "Finding organization ID...";
pub const MSG_VERIFYING_ORGANIZATION: &str = "Verifying organization...";
pub const MSG_FINDING_SESSION: &str = "Finding contact session ID...";
pub const MSG_VALIDATING_SESSION: &str = "Validating session...";

pub const ERR_ORGANIZATION_REQUIRED: &str = "organization ID is required";
pub const ERR_UNVERIFIED_ORGANIZATION: &str = "Unable to verify organization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Org,
    Session,
    Done,
    /// Stopped on the error screen; only a new start leaves it.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationOutcome {
    Valid,
    Invalid { reason: Option<String> },
    /// The check itself failed (transport, server error).
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin, or restart for a different organization.
    Start { organization_id: Option<String> },
    OrganizationChecked {
        generation: u64,
        outcome: OrganizationOutcome,
    },
    SessionLoaded {
        generation: u64,
        contact_session_id: Option<Uuid>,
    },
    SessionChecked { generation: u64, valid: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowLoading(&'static str),
    Fail(String),
    /// Clear the previous run's organization before anything else happens.
    ForgetOrganization,
    RememberOrganization(String),
    ValidateOrganization {
        generation: u64,
        organization_id: String,
    },
    LoadSession {
        generation: u64,
        organization_id: String,
    },
    ValidateSession {
        generation: u64,
        contact_session_id: Uuid,
    },
    Route(Screen),
}

#[derive(Debug, Default)]
pub struct BootstrapMachine {
    generation: u64,
    step: Step,
    organization_id: Option<String>,
    contact_session_id: Option<Uuid>,
    session_valid: bool,
}

impl BootstrapMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn advance(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Start { organization_id } => self.start(organization_id),
            Event::OrganizationChecked {
                generation,
                outcome,
            } => {
                if !self.is_current(generation, Step::Org) {
                    return Vec::new();
                }
                self.organization_checked(outcome)
            }
            Event::SessionLoaded {
                generation,
                contact_session_id,
            } => {
                if !self.is_current(generation, Step::Session) {
                    return Vec::new();
                }
                match contact_session_id {
                    None => {
                        self.session_valid = false;
                        vec![self.finish()]
                    }
                    Some(id) => {
                        self.contact_session_id = Some(id);
                        vec![
                            Effect::ShowLoading(MSG_VALIDATING_SESSION),
                            Effect::ValidateSession {
                                generation,
                                contact_session_id: id,
                            },
                        ]
                    }
                }
            }
            Event::SessionChecked { generation, valid } => {
                if !self.is_current(generation, Step::Session) || self.contact_session_id.is_none()
                {
                    return Vec::new();
                }
                self.session_valid = valid;
                vec![self.finish()]
            }
        }
    }

    fn is_current(&self, generation: u64, step: Step) -> bool {
        generation == self.generation && self.step == step
    }

    fn start(&mut self, organization_id: Option<String>) -> Vec<Effect> {
        self.generation = self.generation.wrapping_add(1);
        self.step = Step::Org;
        self.organization_id = organization_id.filter(|id| !id.trim().is_empty());
        self.contact_session_id = None;
        self.session_valid = false;

        let mut effects = vec![
            Effect::ForgetOrganization,
            Effect::ShowLoading(MSG_FINDING_ORGANIZATION),
        ];
        match &self.organization_id {
            None => {
                self.step = Step::Failed;
                effects.push(Effect::Fail(ERR_ORGANIZATION_REQUIRED.to_string()));
            }
            Some(id) => {
                effects.push(Effect::ShowLoading(MSG_VERIFYING_ORGANIZATION));
                effects.push(Effect::ValidateOrganization {
                    generation: self.generation,
                    organization_id: id.clone(),
                });
            }
        }
        effects
    }

    fn organization_checked(&mut self, outcome: OrganizationOutcome) -> Vec<Effect> {
        let reason = match outcome {
            OrganizationOutcome::Valid => {
                let Some(id) = self.organization_id.clone() else {
                    return Vec::new();
                };
                self.step = Step::Session;
                return vec![
                    Effect::RememberOrganization(id.clone()),
                    Effect::ShowLoading(MSG_FINDING_SESSION),
                    Effect::LoadSession {
                        generation: self.generation,
                        organization_id: id,
                    },
                ];
            }
            OrganizationOutcome::Invalid { reason } => reason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| ERR_UNVERIFIED_ORGANIZATION.to_string()),
            OrganizationOutcome::Unreachable => ERR_UNVERIFIED_ORGANIZATION.to_string(),
        };
        self.step = Step::Failed;
        vec![Effect::Fail(reason)]
    }

    /// Entering `Done` recomputes the route from what is known right now.
    fn finish(&mut self) -> Effect {
        self.step = Step::Done;
        if self.contact_session_id.is_some() && self.session_valid {
            Effect::Route(Screen::Selection)
        } else {
            Effect::Route(Screen::Auth)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Routed(Screen),
    /// A later start took over before this run reached a screen.
    Superseded,
}

enum Call {
    Organization {
        generation: u64,
        organization_id: String,
    },
    Session {
        generation: u64,
        contact_session_id: Uuid,
    },
}

pub struct BootstrapController {
    backend: Arc<dyn WidgetBackend>,
    store: Arc<SessionStore>,
    machine: Mutex<BootstrapMachine>,
}

impl BootstrapController {
    pub fn new(backend: Arc<dyn WidgetBackend>, store: Arc<SessionStore>) -> Self {
        Self {
            backend,
            store,
            machine: Mutex::new(BootstrapMachine::new()),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run the bootstrap for `organization_id` until it routes or is superseded
    /// by a concurrent `run`. Never fails: every failure lands on a screen.
    pub async fn run(&self, organization_id: Option<String>) -> BootstrapOutcome {
        let mut pending = VecDeque::from([Event::Start { organization_id }]);
        let mut routed = None;

        while let Some(event) = pending.pop_front() {
            // Store writes happen under the machine lock so a superseded run
            // can never write after its successor started.
            let calls = {
                let mut machine = self.machine.lock().await;
                let mut calls = Vec::new();
                for effect in machine.advance(event) {
                    match effect {
                        Effect::ShowLoading(message) => {
                            self.store.set_loading_message(message);
                            self.store.set_screen(Screen::Loading);
                        }
                        Effect::Fail(message) => {
                            tracing::warn!(%message, "Widget bootstrap failed");
                            self.store.set_error_message(message);
                            self.store.set_screen(Screen::Error);
                            routed = Some(Screen::Error);
                        }
                        Effect::ForgetOrganization => self.store.forget_organization(),
                        Effect::RememberOrganization(id) => self.store.set_organization_id(id),
                        Effect::LoadSession {
                            generation,
                            organization_id,
                        } => {
                            let contact_session_id = self.load_session(&organization_id);
                            pending.push_back(Event::SessionLoaded {
                                generation,
                                contact_session_id,
                            });
                        }
                        Effect::ValidateOrganization {
                            generation,
                            organization_id,
                        } => calls.push(Call::Organization {
                            generation,
                            organization_id,
                        }),
                        Effect::ValidateSession {
                            generation,
                            contact_session_id,
                        } => calls.push(Call::Session {
                            generation,
                            contact_session_id,
                        }),
                        Effect::Route(screen) => {
                            tracing::info!(%screen, "Widget bootstrap routed");
                            self.store.set_screen(screen);
                            routed = Some(screen);
                        }
                    }
                }
                calls
            };

            for call in calls {
                pending.push_back(self.perform(call).await);
            }
        }

        match routed {
            Some(screen) => BootstrapOutcome::Routed(screen),
            None => {
                tracing::debug!("Widget bootstrap superseded");
                BootstrapOutcome::Superseded
            }
        }
    }

    fn load_session(&self, organization_id: &str) -> Option<Uuid> {
        match self.store.get(organization_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    %organization_id,
                    error = %e,
                    "Could not read persisted contact session"
                );
                None
            }
        }
    }

    async fn perform(&self, call: Call) -> Event {
        match call {
            Call::Organization {
                generation,
                organization_id,
            } => {
                let outcome = match self.backend.validate_organization(&organization_id).await {
                    Ok(check) if check.valid => OrganizationOutcome::Valid,
                    Ok(check) => OrganizationOutcome::Invalid {
                        reason: check.reason,
                    },
                    Err(e) => {
                        tracing::warn!(%organization_id, error = %e, "Organization check failed");
                        OrganizationOutcome::Unreachable
                    }
                };
                Event::OrganizationChecked {
                    generation,
                    outcome,
                }
            }
            Call::Session {
                generation,
                contact_session_id,
            } => {
                let valid = match self.backend.validate_contact_session(contact_session_id).await {
                    Ok(validation) => validation.valid,
                    Err(e) => {
                        tracing::warn!(
                            %contact_session_id,
                            error = %e,
                            "Contact session check failed"
                        );
                        false
                    }
                };
                Event::SessionChecked { generation, valid }
            }
        }
    }
}
