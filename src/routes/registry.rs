//! In-memory record store behind the domain handlers.
//!
//! Stands in for the relational store. Records are keyed maps guarded by
//! `DashMap` shard locks; identifiers come from one process-wide sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::config::CitizenSeed;

/// A registered citizen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citizen {
    pub id: Uuid,
    /// Tokenized national ID; the raw number is never stored.
    pub vid: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub state: String,
    pub district: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mobile_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grievance {
    pub grievance_id: String,
    pub citizen_id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub arn: String,
    pub citizen_id: Uuid,
    pub service_code: String,
    pub status: String,
    pub form_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A scheme citizens can apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Service {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const SERVICES: &[Service] = &[
    Service {
        code: "PMK",
        name: "PM-KISAN",
        description: "Pradhan Mantri Kisan Samman Nidhi",
    },
    Service {
        code: "PMAY",
        name: "PM Awas Yojana",
        description: "Housing for All",
    },
];

pub fn find_service(code: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.code == code)
}

#[derive(Debug, Default)]
pub struct Registry {
    citizens: DashMap<Uuid, Citizen>,
    grievances: DashMap<String, Grievance>,
    applications: DashMap<String, Application>,
    sequence: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the configured citizens.
    pub fn seeded(citizens: &[CitizenSeed]) -> Self {
        let registry = Self::new();
        let now = Utc::now();
        for seed in citizens {
            registry.insert_citizen(Citizen {
                id: seed.id,
                vid: seed.vid.clone(),
                full_name: seed.full_name.clone(),
                date_of_birth: seed.date_of_birth.clone(),
                gender: seed.gender.clone(),
                state: seed.state.clone(),
                district: seed.district.clone(),
                mobile_number: seed.mobile_number.clone(),
                created_at: now,
                updated_at: now,
            });
        }
        registry
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn insert_citizen(&self, citizen: Citizen) {
        self.citizens.insert(citizen.id, citizen);
    }

    pub fn citizen(&self, id: Uuid) -> Option<Citizen> {
        self.citizens.get(&id).map(|c| c.clone())
    }

    /// Returns false if the citizen is unknown.
    pub fn update_mobile_number(&self, id: Uuid, mobile_number: String) -> bool {
        match self.citizens.get_mut(&id) {
            Some(mut citizen) => {
                citizen.mobile_number = mobile_number;
                citizen.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn create_grievance(&self, citizen_id: Uuid, subject: String, description: String) -> Grievance {
        let grievance = Grievance {
            grievance_id: format!("GRV-{:06}", self.next_sequence()),
            citizen_id,
            subject,
            description,
            status: "REGISTERED".to_string(),
            created_at: Utc::now(),
        };
        self.grievances
            .insert(grievance.grievance_id.clone(), grievance.clone());
        grievance
    }

    pub fn grievance(&self, id: &str) -> Option<Grievance> {
        self.grievances.get(id).map(|g| g.clone())
    }

    /// Store a submitted application and return it with its ARN.
    pub fn submit_application(
        &self,
        citizen_id: Uuid,
        service: &Service,
        form_data: serde_json::Value,
    ) -> Application {
        let application = Application {
            arn: format!("ARN-{}-{:06}", service.code, self.next_sequence()),
            citizen_id,
            service_code: service.code.to_string(),
            status: "SUBMITTED".to_string(),
            form_data,
            created_at: Utc::now(),
        };
        self.applications
            .insert(application.arn.clone(), application.clone());
        application
    }

    pub fn application(&self, arn: &str) -> Option<Application> {
        self.applications.get(arn).map(|a| a.clone())
    }
}
