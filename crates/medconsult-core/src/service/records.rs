//! Record service: users, consultations, timelines, conditions, vitals.
//!
//! Thin use-case layer over the repositories for everything that is not a
//! consultation turn. Validation lives here so the HTTP and CLI surfaces
//! share it.

use chrono::Utc;
use uuid::Uuid;

use medconsult_types::condition::Condition;
use medconsult_types::consultation::{Consultation, CreateConsultationRequest, TimelineEntry};
use medconsult_types::error::{ConsultError, RepositoryError};
use medconsult_types::user::{CreateUserRequest, User};
use medconsult_types::vitals::{RecordVitalRequest, VitalsEntry, VitalsQuery};

use crate::repository::condition::ConditionRepository;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::timeline::TimelineRepository;
use crate::repository::user::UserRepository;
use crate::repository::vitals::VitalsRepository;

/// Default page size for a user's recent consultations.
pub const DEFAULT_CONSULTATION_LIMIT: u32 = 5;

pub struct RecordService<U, C, T, K, V> {
    users: U,
    consultations: C,
    timeline: T,
    conditions: K,
    vitals: V,
}

impl<U, C, T, K, V> RecordService<U, C, T, K, V>
where
    U: UserRepository,
    C: ConsultationRepository,
    T: TimelineRepository,
    K: ConditionRepository,
    V: VitalsRepository,
{
    pub fn new(users: U, consultations: C, timeline: T, conditions: K, vitals: V) -> Self {
        Self {
            users,
            consultations,
            timeline,
            conditions,
            vitals,
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, ConsultError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ConsultError::Validation("name cannot be empty".to_string()));
        }
        let email = request.email.trim().to_lowercase();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ConsultError::Validation(format!("invalid email: '{email}'")));
        }

        let user = User::new(name, email);
        match self.users.create_user(&user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "user created");
                Ok(user)
            }
            Err(RepositoryError::Conflict(msg)) => Err(ConsultError::Validation(msg)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<User, ConsultError> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| ConsultError::not_found("user", id))
    }

    /// Open a new consultation for a user.
    ///
    /// A `reference` must name an existing consultation of the same user.
    pub async fn create_consultation(
        &self,
        user_id: &Uuid,
        request: CreateConsultationRequest,
    ) -> Result<Consultation, ConsultError> {
        let user = self.get_user(user_id).await?;
        let heading = request.heading.trim();
        if heading.is_empty() {
            return Err(ConsultError::Validation("heading cannot be empty".to_string()));
        }

        let consultation = Consultation::new(user.id, heading, request.reference);
        if let Some(reference) = request.reference {
            if reference == consultation.id {
                return Err(ConsultError::Validation(
                    "a consultation cannot reference itself".to_string(),
                ));
            }
            let referenced = self.get_consultation(&reference).await?;
            if referenced.user_id != user.id {
                return Err(ConsultError::Validation(format!(
                    "referenced consultation {reference} belongs to another user"
                )));
            }
        }

        let created = self.consultations.create_consultation(&consultation).await?;
        tracing::info!(consultation_id = %created.id, user_id = %user.id, "consultation created");
        Ok(created)
    }

    pub async fn get_consultation(&self, id: &Uuid) -> Result<Consultation, ConsultError> {
        self.consultations
            .get_consultation(id)
            .await?
            .ok_or_else(|| ConsultError::not_found("consultation", id))
    }

    /// Most recently active consultations first.
    pub async fn list_consultations(
        &self,
        user_id: &Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<Consultation>, ConsultError> {
        self.get_user(user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_CONSULTATION_LIMIT).max(1);
        Ok(self.consultations.list_consultations(user_id, limit).await?)
    }

    /// Full chronological timeline of a consultation.
    pub async fn timeline(&self, consultation_id: &Uuid) -> Result<Vec<TimelineEntry>, ConsultError> {
        self.get_consultation(consultation_id).await?;
        Ok(self.timeline.list_entries(consultation_id).await?)
    }

    pub async fn list_conditions(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> Result<Vec<Condition>, ConsultError> {
        self.get_user(user_id).await?;
        Ok(self.conditions.list_conditions(user_id, active_only).await?)
    }

    pub async fn record_vital(
        &self,
        user_id: &Uuid,
        request: RecordVitalRequest,
    ) -> Result<VitalsEntry, ConsultError> {
        self.get_user(user_id).await?;
        let metric_name = request.metric_name.trim();
        if metric_name.is_empty() {
            return Err(ConsultError::Validation("metric_name cannot be empty".to_string()));
        }
        if !request.metric_value.is_finite() {
            return Err(ConsultError::Validation(format!(
                "metric_value must be finite, got {}",
                request.metric_value
            )));
        }
        if let Some(consultation_id) = request.consultation_id {
            let consultation = self.get_consultation(&consultation_id).await?;
            if consultation.user_id != *user_id {
                return Err(ConsultError::not_found("consultation", consultation_id));
            }
        }

        let entry = VitalsEntry {
            id: Uuid::now_v7(),
            user_id: *user_id,
            metric_name: metric_name.to_string(),
            metric_value: request.metric_value,
            consultation_id: request.consultation_id,
            recorded_at: request.recorded_at.unwrap_or_else(Utc::now),
        };
        Ok(self.vitals.record_vital(&entry).await?)
    }

    pub async fn query_vitals(
        &self,
        user_id: &Uuid,
        query: &VitalsQuery,
    ) -> Result<Vec<VitalsEntry>, ConsultError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ConsultError::Validation(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }
        self.get_user(user_id).await?;
        Ok(self.vitals.query_vitals(user_id, query).await?)
    }
}
