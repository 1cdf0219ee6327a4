//! Program authoring and catalog service.

use serde::Deserialize;
use serde_json::json;
use serde_with::{NoneAsEmptyString, serde_as};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::services::authorization::{
    clean_optional, owner_scope, require_author, require_manager,
};
use crate::domain::entities::{
    NewProgram, Page, Profile, Program, ProgramOverview, ProgramPatch, ProgramStatus,
};
use crate::domain::repositories::{CurriculumRepository, ProgramRepository};
use crate::error::AppError;
use crate::infrastructure::storage::ObjectStorage;
use crate::utils::slug::{slugify, with_suffix};

const MAX_SLUG_ATTEMPTS: usize = 5;
pub const MAX_PAGE_SIZE: i64 = 50;
/// Longest timed access period a program may sell, in days.
pub const MAX_ACCESS_DAYS: i32 = 3650;

/// Program fields as submitted by the editor form.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgramInput {
    #[validate(length(min = 3, max = 120, message = "Title must be 3 to 120 characters"))]
    pub title: String,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 280, message = "Summary must be at most 280 characters"))]
    pub summary: Option<String>,

    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,

    #[validate(range(min = 0, max = 100_000_000, message = "Price must not be negative"))]
    pub price: i64,

    /// Empty means lifetime access.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(range(min = 1, max = MAX_ACCESS_DAYS, message = "Access period must be 1 to 3650 days"))]
    pub access_days: Option<i32>,
}

impl ProgramInput {
    fn normalized(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.summary = clean_optional(self.summary);
        self.description = self.description.trim().to_string();
        self.validate()?;
        Ok(self)
    }
}

/// Service for creating, publishing and listing programs.
pub struct ProgramService<P: ProgramRepository, C: CurriculumRepository> {
    programs: Arc<P>,
    curriculum: Arc<C>,
    storage: Arc<dyn ObjectStorage>,
    currency: String,
    max_upload_bytes: usize,
}

impl<P: ProgramRepository, C: CurriculumRepository> ProgramService<P, C> {
    pub fn new(
        programs: Arc<P>,
        curriculum: Arc<C>,
        storage: Arc<dyn ObjectStorage>,
        currency: String,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            programs,
            curriculum,
            storage,
            currency,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Currency new programs are priced in.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Creates a draft program owned by `actor`.
    ///
    /// The slug is derived from the title; a random suffix is appended when
    /// it is taken or when the title yields no usable slug.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Forbidden`] for members and
    /// [`AppError::Validation`] for invalid input.
    pub async fn create(&self, actor: &Profile, input: ProgramInput) -> Result<Program, AppError> {
        require_author(actor)?;
        let input = input.normalized()?;
        let slug = self.unique_slug(&input.title).await?;

        let program = self
            .programs
            .create(NewProgram {
                coach_id: actor.id,
                slug,
                title: input.title,
                summary: input.summary,
                description: input.description,
                price: input.price,
                currency: self.currency.clone(),
                access_days: input.access_days,
            })
            .await?;

        tracing::info!(program_id = program.id, slug = %program.slug, "Program created");
        Ok(program)
    }

    /// Replaces the editable fields. The slug never changes.
    pub async fn update(
        &self,
        actor: &Profile,
        id: i64,
        input: ProgramInput,
    ) -> Result<Program, AppError> {
        self.find_managed(actor, id).await?;
        let input = input.normalized()?;

        self.programs
            .update(
                id,
                ProgramPatch {
                    title: Some(input.title),
                    summary: Some(input.summary),
                    description: Some(input.description),
                    price: Some(input.price),
                    access_days: Some(input.access_days),
                    thumbnail_url: None,
                },
            )
            .await
    }

    /// Makes a program visible in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the curriculum has no days yet.
    pub async fn publish(&self, actor: &Profile, id: i64) -> Result<Program, AppError> {
        let program = self.find_managed(actor, id).await?;

        if self.curriculum.count_days(id).await? == 0 {
            return Err(AppError::bad_request(
                "Add at least one day before publishing",
                json!({ "program_id": id }),
            ));
        }

        let published = self
            .programs
            .set_status(program.id, ProgramStatus::Published)
            .await?;
        tracing::info!(program_id = id, "Program published");
        Ok(published)
    }

    pub async fn unpublish(&self, actor: &Profile, id: i64) -> Result<Program, AppError> {
        self.find_managed(actor, id).await?;
        self.programs.set_status(id, ProgramStatus::Draft).await
    }

    /// Hides a program from the catalog. Existing enrollments keep access.
    pub async fn archive(&self, actor: &Profile, id: i64) -> Result<Program, AppError> {
        self.find_managed(actor, id).await?;
        let archived = self.programs.set_status(id, ProgramStatus::Archived).await?;
        tracing::info!(program_id = id, "Program archived");
        Ok(archived)
    }

    /// Deletes a program that has never been ordered.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if any order references it.
    pub async fn delete(&self, actor: &Profile, id: i64) -> Result<(), AppError> {
        let program = self.find_managed(actor, id).await?;

        if self.programs.has_orders(id).await? {
            return Err(AppError::conflict(
                "Programs with orders cannot be deleted; archive it instead",
                json!({ "program_id": id }),
            ));
        }

        if !self.programs.delete(id).await? {
            return Err(program_not_found(id));
        }

        if let Some(url) = program.thumbnail_url.as_deref() {
            self.remove_object(url).await;
        }

        tracing::info!(program_id = id, "Program deleted");
        Ok(())
    }

    /// Stores a new thumbnail and removes the previous one.
    ///
    /// The image type is taken from the file signature and must agree with
    /// the declared content type.
    pub async fn upload_thumbnail(
        &self,
        actor: &Profile,
        id: i64,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Program, AppError> {
        let program = self.find_managed(actor, id).await?;

        if bytes.is_empty() {
            return Err(AppError::bad_request("Choose an image to upload", json!({})));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(AppError::bad_request(
                "Image is too large",
                json!({ "size": bytes.len(), "max": self.max_upload_bytes }),
            ));
        }
        let extension = image_extension(content_type, &bytes)?;

        let path = format!("programs/{}/{}.{}", id, Uuid::new_v4(), extension);
        let url = self.storage.upload(&path, content_type, bytes).await?;

        let updated = self
            .programs
            .update(
                id,
                ProgramPatch {
                    thumbnail_url: Some(Some(url)),
                    ..ProgramPatch::default()
                },
            )
            .await?;

        if let Some(old) = program.thumbnail_url.as_deref() {
            self.remove_object(old).await;
        }

        Ok(updated)
    }

    /// Published programs, newest first.
    pub async fn catalog(&self, page: i64, page_size: i64) -> Result<Page<Program>, AppError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let (items, total) = tokio::try_join!(
            self.programs.list_published(page, page_size),
            self.programs.count_published()
        )?;

        Ok(Page::new(items, page, page_size, total))
    }

    pub async fn count_published(&self) -> Result<i64, AppError> {
        self.programs.count_published().await
    }

    /// Looks up a program in any status.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Program, AppError> {
        self.programs
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Program not found", json!({ "slug": slug })))
    }

    pub async fn get(&self, id: i64) -> Result<Program, AppError> {
        self.programs
            .find_by_id(id)
            .await?
            .ok_or_else(|| program_not_found(id))
    }

    /// Looks up a program that is currently on sale.
    pub async fn get_published(&self, slug: &str) -> Result<Program, AppError> {
        let program = self.get_by_slug(slug).await?;
        if !program.is_published() {
            return Err(AppError::not_found(
                "Program not found",
                json!({ "slug": slug }),
            ));
        }
        Ok(program)
    }

    /// Loads a program the actor may edit.
    pub async fn find_managed(&self, actor: &Profile, id: i64) -> Result<Program, AppError> {
        let program = self.get(id).await?;
        require_manager(actor, &program.coach_id)?;
        Ok(program)
    }

    /// The actor's programs with member and revenue figures (all programs for admins).
    pub async fn coach_overview(&self, actor: &Profile) -> Result<Vec<ProgramOverview>, AppError> {
        require_author(actor)?;
        self.programs.overview(owner_scope(actor)).await
    }

    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let base = slugify(title);
        let mut candidate = base.clone().unwrap_or_else(|| with_suffix(None));

        for _ in 0..MAX_SLUG_ATTEMPTS {
            if !self.programs.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            candidate = with_suffix(base.as_deref());
        }

        Err(AppError::internal(
            "Failed to generate unique slug",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    async fn remove_object(&self, public_url: &str) {
        let Some(path) = self.storage.path_of(public_url) else {
            return;
        };
        if let Err(e) = self.storage.remove(&path).await {
            tracing::warn!(error = %e, path = %path, "Failed to remove stored object");
        }
    }
}

fn program_not_found(id: i64) -> AppError {
    AppError::not_found("Program not found", json!({ "program_id": id }))
}

/// File extension for a supported image, checked against its magic bytes.
fn image_extension(content_type: &str, bytes: &[u8]) -> Result<&'static str, AppError> {
    let sniffed = if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(("image/jpeg", "jpg"))
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("image/png", "png"))
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(("image/webp", "webp"))
    } else {
        None
    };

    match sniffed {
        Some((mime, extension)) if mime == content_type => Ok(extension),
        _ => Err(AppError::bad_request(
            "Only JPEG, PNG and WebP images are supported",
            json!({ "content_type": content_type }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Role;
    use crate::domain::entities::fixtures::{profile, sample_program};
    use crate::domain::repositories::{MockCurriculumRepository, MockProgramRepository};
    use crate::infrastructure::storage::MockObjectStorage;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn input(title: &str) -> ProgramInput {
        ProgramInput {
            title: title.to_string(),
            summary: Some("  ".to_string()),
            description: "Squat often.".to_string(),
            price: 49000,
            access_days: Some(90),
        }
    }

    fn service(
        programs: MockProgramRepository,
        curriculum: MockCurriculumRepository,
        storage: MockObjectStorage,
    ) -> ProgramService<MockProgramRepository, MockCurriculumRepository> {
        ProgramService::new(
            Arc::new(programs),
            Arc::new(curriculum),
            Arc::new(storage),
            "KRW".to_string(),
            1024,
        )
    }

    fn owned_program(owner: &Profile) -> Program {
        let mut program = sample_program(49000, Some(90));
        program.coach_id = owner.id;
        program
    }

    #[test]
    fn test_access_days_are_capped() {
        let mut program = input("Strength Basics");
        program.access_days = Some(MAX_ACCESS_DAYS);
        assert!(program.validate().is_ok());

        program.access_days = Some(MAX_ACCESS_DAYS + 1);
        assert!(program.validate().is_err());

        program.access_days = None;
        assert!(program.validate().is_ok());
    }

    #[tokio::test]
    async fn test_create_uses_title_slug() {
        let coach = profile(Role::Coach);
        let coach_id = coach.id;

        let mut programs = MockProgramRepository::new();
        programs
            .expect_slug_exists()
            .withf(|slug| slug == "strength-basics")
            .returning(|_| Ok(false));
        programs
            .expect_create()
            .withf(move |p| {
                p.slug == "strength-basics"
                    && p.coach_id == coach_id
                    && p.summary.is_none()
                    && p.currency == "KRW"
            })
            .times(1)
            .returning(|_| Ok(sample_program(49000, Some(90))));

        let result = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .create(&coach, input("Strength Basics"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_suffixes_taken_slug() {
        let coach = profile(Role::Coach);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_slug_exists()
            .returning(|slug| Ok(slug == "strength-basics"));
        programs
            .expect_create()
            .withf(|p| p.slug.starts_with("strength-basics-") && p.slug.len() == 22)
            .times(1)
            .returning(|_| Ok(sample_program(49000, Some(90))));

        service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .create(&coach, input("Strength Basics"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_non_latin_title_gets_generated_slug() {
        let coach = profile(Role::Coach);

        let mut programs = MockProgramRepository::new();
        programs.expect_slug_exists().returning(|_| Ok(false));
        programs
            .expect_create()
            .withf(|p| p.slug.starts_with("program-"))
            .times(1)
            .returning(|_| Ok(sample_program(0, None)));

        service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .create(&coach, input("근력 기초 과정"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_member_cannot_create() {
        let member = profile(Role::Member);
        let result = service(
            MockProgramRepository::new(),
            MockCurriculumRepository::new(),
            MockObjectStorage::new(),
        )
        .create(&member, input("Strength Basics"))
        .await;

        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_short_title_and_negative_price() {
        let coach = profile(Role::Coach);
        let svc = service(
            MockProgramRepository::new(),
            MockCurriculumRepository::new(),
            MockObjectStorage::new(),
        );

        assert!(matches!(
            svc.create(&coach, input(" ab ")).await,
            Err(AppError::Validation { .. })
        ));

        let mut negative = input("Strength Basics");
        negative.price = -1;
        assert!(matches!(
            svc.create(&coach, negative).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_requires_a_day() {
        let coach = profile(Role::Coach);
        let program = owned_program(&coach);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));
        programs.expect_set_status().times(0);

        let mut curriculum = MockCurriculumRepository::new();
        curriculum.expect_count_days().returning(|_| Ok(0));

        let result = service(programs, curriculum, MockObjectStorage::new())
            .publish(&coach, 1)
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_publish_by_other_coach_is_forbidden() {
        let owner = profile(Role::Coach);
        let other = profile(Role::Coach);
        let program = owned_program(&owner);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));

        let result = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .publish(&other, 1)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_publish_sets_status() {
        let coach = profile(Role::Coach);
        let program = owned_program(&coach);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));
        programs
            .expect_set_status()
            .withf(|id, status| *id == 1 && *status == ProgramStatus::Published)
            .times(1)
            .returning(|_, _| Ok(sample_program(49000, Some(90))));

        let mut curriculum = MockCurriculumRepository::new();
        curriculum.expect_count_days().returning(|_| Ok(3));

        service(programs, curriculum, MockObjectStorage::new())
            .publish(&coach, 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_with_orders_conflicts() {
        let coach = profile(Role::Coach);
        let program = owned_program(&coach);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));
        programs.expect_has_orders().returning(|_| Ok(true));
        programs.expect_delete().times(0);

        let result = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .delete(&coach, 1)
            .await;
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_upload_thumbnail_replaces_previous_object() {
        let coach = profile(Role::Coach);
        let mut program = owned_program(&coach);
        program.thumbnail_url = Some("https://cdn.example/old.png".to_string());

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));
        programs
            .expect_update()
            .withf(|_, patch| {
                matches!(&patch.thumbnail_url, Some(Some(url)) if url == "https://cdn.example/new.png")
                    && patch.title.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(sample_program(49000, Some(90))));

        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .withf(|path, content_type, _| {
                path.starts_with("programs/1/") && path.ends_with(".png") && content_type == "image/png"
            })
            .times(1)
            .returning(|_, _, _| Ok("https://cdn.example/new.png".to_string()));
        storage
            .expect_path_of()
            .returning(|_| Some("programs/1/old.png".to_string()));
        storage
            .expect_remove()
            .withf(|path| path == "programs/1/old.png")
            .times(1)
            .returning(|_| Err(AppError::upstream("storage down", json!({}))));

        let result = service(programs, MockCurriculumRepository::new(), storage)
            .upload_thumbnail(&coach, 1, "image/png", PNG.to_vec())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_upload_thumbnail_rejects_mismatched_type_and_size() {
        let coach = profile(Role::Coach);
        let program = owned_program(&coach);

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));

        let svc = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new());

        assert!(matches!(
            svc.upload_thumbnail(&coach, 1, "image/jpeg", PNG.to_vec()).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            svc.upload_thumbnail(&coach, 1, "image/png", vec![0u8; 2048]).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            svc.upload_thumbnail(&coach, 1, "image/gif", b"GIF89a....".to_vec()).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_catalog_clamps_page_size() {
        let mut programs = MockProgramRepository::new();
        programs
            .expect_list_published()
            .withf(|page, size| *page == 1 && *size == MAX_PAGE_SIZE)
            .returning(|_, _| Ok(vec![sample_program(0, None)]));
        programs.expect_count_published().returning(|| Ok(1));

        let page = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .catalog(0, 500)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 1);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_get_published_hides_drafts() {
        let mut draft = sample_program(0, None);
        draft.status = ProgramStatus::Draft;

        let mut programs = MockProgramRepository::new();
        programs
            .expect_find_by_slug()
            .returning(move |_| Ok(Some(draft.clone())));

        let result = service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .get_published("strength-basics")
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_coach_overview_scopes_to_owner() {
        let coach = profile(Role::Coach);
        let coach_id = coach.id;

        let mut programs = MockProgramRepository::new();
        programs
            .expect_overview()
            .withf(move |scope| *scope == Some(coach_id))
            .times(1)
            .returning(|_| Ok(vec![]));

        service(programs, MockCurriculumRepository::new(), MockObjectStorage::new())
            .coach_overview(&coach)
            .await
            .unwrap();
    }

    #[test]
    fn test_image_extension_sniffing() {
        assert_eq!(image_extension("image/png", PNG).unwrap(), "png");
        assert_eq!(
            image_extension("image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(),
            "jpg"
        );
        assert_eq!(
            image_extension("image/webp", b"RIFF\0\0\0\0WEBPVP8 ").unwrap(),
            "webp"
        );
        assert!(image_extension("image/png", b"<svg></svg>").is_err());
    }
}
