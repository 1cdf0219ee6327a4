//! Access checks, member listings and operator grants.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::application::services::authorization::require_manager;
use crate::domain::enrollment_sweeper::sweep_once;
use crate::domain::entities::{
    Enrollment, EnrollmentGrant, EnrollmentOverview, MemberEnrollment, Profile, Program,
};
use crate::domain::repositories::{EnrollmentRepository, ProfileRepository, ProgramRepository};
use crate::error::AppError;

/// What a viewer may do with a program's content.
#[derive(Debug, Clone)]
pub enum Access {
    /// The viewer authored the program.
    Owner,
    Admin,
    /// The viewer holds an enrollment that is active right now.
    Enrolled(Enrollment),
    None,
}

impl Access {
    /// Returns true if the viewer may open the program's days.
    pub fn can_learn(&self) -> bool {
        !matches!(self, Access::None)
    }

    /// The active enrollment, if access comes from one.
    pub fn enrollment(&self) -> Option<&Enrollment> {
        match self {
            Access::Enrolled(enrollment) => Some(enrollment),
            _ => None,
        }
    }
}

pub struct EnrollmentService<E, P, U>
where
    E: EnrollmentRepository,
    P: ProgramRepository,
    U: ProfileRepository,
{
    enrollments: Arc<E>,
    programs: Arc<P>,
    profiles: Arc<U>,
}

impl<E, P, U> EnrollmentService<E, P, U>
where
    E: EnrollmentRepository,
    P: ProgramRepository,
    U: ProfileRepository,
{
    pub fn new(enrollments: Arc<E>, programs: Arc<P>, profiles: Arc<U>) -> Self {
        Self {
            enrollments,
            programs,
            profiles,
        }
    }

    /// Resolves the viewer's access to `program`.
    ///
    /// An enrollment past its expiry grants nothing, whether or not the
    /// sweeper has already marked it expired.
    pub async fn access(&self, viewer: Option<&Profile>, program: &Program) -> Result<Access, AppError> {
        let Some(viewer) = viewer else {
            return Ok(Access::None);
        };

        if program.is_owned_by(&viewer.id) {
            return Ok(Access::Owner);
        }
        if viewer.is_admin() {
            return Ok(Access::Admin);
        }

        let enrollment = self
            .enrollments
            .find(&viewer.id, program.id)
            .await?
            .filter(|e| e.is_active_at(Utc::now()));

        Ok(enrollment.map_or(Access::None, Access::Enrolled))
    }

    /// The user's enrollments with program info and completion counts.
    pub async fn my_enrollments(&self, user: &Profile) -> Result<Vec<EnrollmentOverview>, AppError> {
        self.enrollments.list_for_user(&user.id).await
    }

    /// Members of a program, for its coach or an admin.
    pub async fn members(
        &self,
        actor: &Profile,
        program_id: i64,
    ) -> Result<(Program, Vec<MemberEnrollment>), AppError> {
        let program = self
            .programs
            .find_by_id(program_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Program not found", json!({ "program_id": program_id }))
            })?;
        require_manager(actor, &program.coach_id)?;

        let members = self.enrollments.list_members(program_id).await?;
        Ok((program, members))
    }

    /// Grants access without an order, applying the program's access period.
    ///
    /// Used by operators for comps and support cases.
    pub async fn grant(&self, email: &str, slug: &str) -> Result<Enrollment, AppError> {
        let email = email.trim().to_lowercase();
        let profile = self
            .profiles
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({ "email": email })))?;

        let program = self
            .programs
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Program not found", json!({ "slug": slug })))?;

        let enrollment = self
            .enrollments
            .grant(EnrollmentGrant {
                user_id: profile.id,
                program_id: program.id,
                order_id: None,
                access_days: program.access_days,
            })
            .await?;

        tracing::info!(
            user_id = %profile.id,
            program_id = program.id,
            enrollment_id = enrollment.id,
            "Enrollment granted by operator"
        );
        Ok(enrollment)
    }

    /// Expires lapsed enrollments now. Returns how many were expired.
    pub async fn sweep(&self) -> u64 {
        sweep_once(self.enrollments.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::{enrollment, profile, sample_program};
    use crate::domain::entities::{EnrollmentStatus, Role};
    use crate::domain::repositories::{
        MockEnrollmentRepository, MockProfileRepository, MockProgramRepository,
    };
    use chrono::Duration;

    type Service =
        EnrollmentService<MockEnrollmentRepository, MockProgramRepository, MockProfileRepository>;

    fn service(enrollments: MockEnrollmentRepository, programs: MockProgramRepository) -> Service {
        EnrollmentService::new(
            Arc::new(enrollments),
            Arc::new(programs),
            Arc::new(MockProfileRepository::new()),
        )
    }

    #[tokio::test]
    async fn test_anonymous_viewer_has_no_access() {
        let access = service(MockEnrollmentRepository::new(), MockProgramRepository::new())
            .access(None, &sample_program(0, None))
            .await
            .unwrap();
        assert!(!access.can_learn());
    }

    #[tokio::test]
    async fn test_owner_and_admin_access() {
        let coach = profile(Role::Coach);
        let mut program = sample_program(49000, None);
        program.coach_id = coach.id;

        let svc = service(MockEnrollmentRepository::new(), MockProgramRepository::new());

        let owner = svc.access(Some(&coach), &program).await.unwrap();
        assert!(matches!(owner, Access::Owner));

        let admin = svc.access(Some(&profile(Role::Admin)), &program).await.unwrap();
        assert!(matches!(admin, Access::Admin));
        assert!(admin.enrollment().is_none());
    }

    #[tokio::test]
    async fn test_active_enrollment_grants_access() {
        let member = profile(Role::Member);

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_find().returning(|_, _| {
            let now = Utc::now();
            Ok(Some(enrollment(
                EnrollmentStatus::Active,
                now,
                Some(now + Duration::days(5)),
            )))
        });

        let access = service(enrollments, MockProgramRepository::new())
            .access(Some(&member), &sample_program(49000, Some(30)))
            .await
            .unwrap();
        assert!(access.can_learn());
        assert!(access.enrollment().is_some());
    }

    #[tokio::test]
    async fn test_lapsed_enrollment_denies_access_before_sweep() {
        let member = profile(Role::Member);

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_find().returning(|_, _| {
            let now = Utc::now();
            Ok(Some(enrollment(
                EnrollmentStatus::Active,
                now - Duration::days(31),
                Some(now - Duration::minutes(1)),
            )))
        });

        let access = service(enrollments, MockProgramRepository::new())
            .access(Some(&member), &sample_program(49000, Some(30)))
            .await
            .unwrap();
        assert!(matches!(access, Access::None));
    }

    #[tokio::test]
    async fn test_canceled_enrollment_denies_access() {
        let member = profile(Role::Member);

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_find()
            .returning(|_, _| Ok(Some(enrollment(EnrollmentStatus::Canceled, Utc::now(), None))));

        let access = service(enrollments, MockProgramRepository::new())
            .access(Some(&member), &sample_program(49000, None))
            .await
            .unwrap();
        assert!(!access.can_learn());
    }

    #[tokio::test]
    async fn test_members_requires_manager() {
        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(|_| Ok(Some(sample_program(49000, None))));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_list_members().times(0);

        let result = service(enrollments, programs)
            .members(&profile(Role::Coach), 1)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_grant_uses_program_access_days() {
        let member = profile(Role::Member);
        let member_id = member.id;

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_email()
            .withf(|email| email == "member@example.com")
            .returning(move |_| Ok(Some(member.clone())));

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_slug()
            .returning(|_| Ok(Some(sample_program(49000, Some(90)))));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_grant()
            .withf(move |g| {
                g.user_id == member_id && g.access_days == Some(90) && g.order_id.is_none()
            })
            .times(1)
            .returning(|_| Ok(enrollment(EnrollmentStatus::Active, Utc::now(), None)));

        EnrollmentService::new(Arc::new(enrollments), Arc::new(programs), Arc::new(profiles))
            .grant(" Member@Example.com ", "strength-basics")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_grant_unknown_user_is_not_found() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_email().returning(|_| Ok(None));

        let result = EnrollmentService::new(
            Arc::new(MockEnrollmentRepository::new()),
            Arc::new(MockProgramRepository::new()),
            Arc::new(profiles),
        )
        .grant("nobody@example.com", "strength-basics")
        .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
