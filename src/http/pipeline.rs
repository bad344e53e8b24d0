//! Per-route stage composition.
//!
//! # Responsibilities
//! - Describe each route's middleware as an ordered list of named stages
//! - Reject stage lists that break the fixed order
//! - Turn a stage list into axum layers around one method router
//!
//! # Design Decisions
//! - Stage order is fixed: identity → quota → audit → redaction → handler.
//!   A pipeline may omit stages but never reorder them
//! - The origin check is router-wide (see `security::origin`) and runs ahead
//!   of every pipeline, including preflight requests that match no handler
//! - Every stage shares the `(request, next) -> response` contract of
//!   `axum::middleware::from_fn_with_state`

use std::fmt;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use thiserror::Error;

use crate::audit::{audit_middleware, AuditRecorder, AuditStage};
use crate::security::identity::{identity_middleware, IdentityVerifier};
use crate::security::rate_limit::{quota_middleware, QuotaEnforcer};
use crate::security::redaction::{redaction_middleware, Redactor};

/// One named step of a route pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Verify the bearer credential and attach the caller identity.
    Identity,
    /// Count the request against the identity, or the client address.
    Quota,
    /// Record the action taken by the identified caller.
    Audit {
        action: &'static str,
        resource: &'static str,
    },
    /// Mask national-ID numbers in the handler's response.
    Redaction,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Identity => "identity",
            Stage::Quota => "quota",
            Stage::Audit { .. } => "audit",
            Stage::Redaction => "redaction",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Stage::Identity => 0,
            Stage::Quota => 1,
            Stage::Audit { .. } => 2,
            Stage::Redaction => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("stage `{stage}` cannot run after `{after}`")]
    OutOfOrder { stage: Stage, after: Stage },

    #[error("audit stage requires an identity stage")]
    AuditWithoutIdentity,
}

/// Shared components the stages run with.
#[derive(Clone)]
pub struct PipelineContext {
    pub verifier: Arc<IdentityVerifier>,
    pub quota: Arc<QuotaEnforcer>,
    pub audit: Arc<AuditRecorder>,
    pub redactor: Arc<Redactor>,
}

/// Ordered stages wrapped around one route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline from an explicit stage list.
    ///
    /// # Errors
    /// Returns error if a stage is repeated or out of order, or if auditing is
    /// requested without an identity stage.
    pub fn new(stages: Vec<Stage>) -> Result<Self, PipelineError> {
        for pair in stages.windows(2) {
            if pair[1].rank() <= pair[0].rank() {
                return Err(PipelineError::OutOfOrder {
                    stage: pair[1],
                    after: pair[0],
                });
            }
        }

        let audits = stages.iter().any(|s| matches!(s, Stage::Audit { .. }));
        if audits && !stages.contains(&Stage::Identity) {
            return Err(PipelineError::AuditWithoutIdentity);
        }

        Ok(Self { stages })
    }

    /// Identity, quota, audit and redaction around a privileged handler.
    pub fn protected(action: &'static str, resource: &'static str) -> Self {
        Self {
            stages: vec![
                Stage::Identity,
                Stage::Quota,
                Stage::Audit { action, resource },
                Stage::Redaction,
            ],
        }
    }

    /// Redaction only.
    pub fn public() -> Self {
        Self {
            stages: vec![Stage::Redaction],
        }
    }

    /// Anonymous-tier quota, then redaction.
    pub fn public_limited() -> Self {
        Self {
            stages: vec![Stage::Quota, Stage::Redaction],
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage names in execution order, for startup logs.
    pub fn describe(&self) -> String {
        self.stages
            .iter()
            .map(Stage::name)
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Wrap `route` so the first stage is the outermost layer.
    pub fn wrap<S>(&self, route: MethodRouter<S>, ctx: &PipelineContext) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // `layer` wraps from the outside in, so apply the last stage first.
        self.stages.iter().rev().fold(route, |route, stage| match *stage {
            Stage::Identity => {
                route.layer(from_fn_with_state(ctx.verifier.clone(), identity_middleware))
            }
            Stage::Quota => route.layer(from_fn_with_state(ctx.quota.clone(), quota_middleware)),
            Stage::Audit { action, resource } => route.layer(from_fn_with_state(
                AuditStage {
                    recorder: ctx.audit.clone(),
                    action,
                    resource,
                },
                audit_middleware,
            )),
            Stage::Redaction => {
                route.layer(from_fn_with_state(ctx.redactor.clone(), redaction_middleware))
            }
        })
    }
}
