// src/services/quizzes.rs

use rand::seq::SliceRandom;

use crate::{
    error::AppError,
    models::{
        quiz::{CourseQuiz, CreateQuizRequest, Quiz, QuizDetail, QuizForTaking, UpdateQuizRequest},
        user::AuthUser,
    },
    services::QuizService,
};

impl QuizService {
    /// Creates a quiz in an existing course, owned by `creator_id`.
    pub async fn create_quiz(
        &self,
        req: CreateQuizRequest,
        creator_id: &str,
    ) -> Result<Quiz, AppError> {
        let new_quiz = req.into_new_quiz(creator_id)?;

        if !self.courses.course_exists(new_quiz.course_id).await? {
            return Err(AppError::NotFound("Course not found".to_string()));
        }

        let quiz = self.store.insert_quiz(new_quiz).await?;
        tracing::info!(
            quiz_id = quiz.id,
            course_id = quiz.course_id,
            created_by = %quiz.created_by,
            "Quiz created"
        );
        Ok(quiz)
    }

    /// Applies a partial update. Only the creator may edit.
    pub async fn update_quiz(
        &self,
        quiz_id: i64,
        patch: UpdateQuizRequest,
        requester_id: &str,
    ) -> Result<Quiz, AppError> {
        let mut quiz = self.require_quiz(quiz_id).await?;
        if !quiz.is_owned_by(requester_id) {
            return Err(AppError::Forbidden(
                "You can only update quizzes you created".to_string(),
            ));
        }

        patch.apply_to(&mut quiz)?;

        if !self.store.save_quiz(&quiz).await? {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        tracing::info!(quiz_id, "Quiz updated");

        self.require_quiz(quiz_id).await
    }

    /// Deletes a quiz together with all of its attempts. Only the creator may delete.
    pub async fn delete_quiz(&self, quiz_id: i64, requester_id: &str) -> Result<(), AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        if !quiz.is_owned_by(requester_id) {
            return Err(AppError::Forbidden(
                "You can only delete quizzes you created".to_string(),
            ));
        }

        let purged = self
            .store
            .delete_quiz(quiz_id)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

        tracing::info!(quiz_id, attempts_purged = purged, "Quiz deleted");
        Ok(())
    }

    /// Full quiz, answer keys included. Unpublished quizzes are visible to their creator and admins only.
    pub async fn get_quiz_by_id(
        &self,
        quiz_id: i64,
        requester: Option<&AuthUser>,
    ) -> Result<Quiz, AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        if quiz.is_published {
            return Ok(quiz);
        }

        let allowed = requester.is_some_and(|u| u.is_admin() || quiz.is_owned_by(&u.id));
        if !allowed {
            return Err(AppError::Forbidden("This quiz is not published".to_string()));
        }
        Ok(quiz)
    }

    /// Quiz projection for a taker: answer keys stripped, questions shuffled if configured.
    pub async fn get_quiz_for_taking(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<QuizForTaking, AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        if !quiz.is_published {
            return Err(AppError::Forbidden("This quiz is not published".to_string()));
        }

        let eligibility = self.eligibility_for(&quiz, user_id).await?;
        if !eligibility.allowed {
            return Err(AppError::Forbidden(eligibility.reason.unwrap_or_default()));
        }

        let mut view = QuizForTaking::new(&quiz, eligibility.attempt_count);
        if quiz.shuffle_questions {
            view.questions.shuffle(&mut rand::thread_rng());
        }
        Ok(view)
    }

    /// Quizzes of a course. When `user_id` is known each quiz carries that user's completed attempts.
    pub async fn list_course_quizzes(
        &self,
        course_id: i64,
        user_id: Option<&str>,
        include_unpublished: bool,
    ) -> Result<Vec<CourseQuiz>, AppError> {
        let quizzes = self.store.list_quizzes(course_id, include_unpublished).await?;

        let mut listed = Vec::with_capacity(quizzes.len());
        for quiz in quizzes {
            let user_attempts = match user_id {
                Some(uid) => Some(self.store.list_completed_attempts(quiz.id, Some(uid)).await?),
                None => None,
            };
            listed.push(CourseQuiz {
                detail: QuizDetail::from(quiz),
                user_attempts,
            });
        }
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::AppError,
        models::{
            quiz::UpdateQuizRequest,
            user::{AuthUser, Role},
        },
        services::test_support::{COURSE_ID, INSTRUCTOR, geography_request, published_quiz, service},
        store::QuizStore,
    };

    fn user(id: &str, role: Role) -> AuthUser {
        AuthUser { id: id.to_string(), role }
    }

    #[tokio::test]
    async fn test_create_requires_existing_course() {
        let (service, _) = service();
        let mut req = geography_request();
        req.course_id = 999;

        let err = service.create_quiz(req, INSTRUCTOR).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_points() {
        let (service, store) = service();
        let mut req = geography_request();
        for question in &mut req.questions {
            question.points = i32::MAX;
        }

        let err = service.create_quiz(req, INSTRUCTOR).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.list_quizzes(COURSE_ID, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sets_creator() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |_| {}).await;
        assert_eq!(quiz.created_by, INSTRUCTOR);
        assert_eq!(quiz.total_points(), 10);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |_| {}).await;
        let patch = UpdateQuizRequest {
            title: Some("Hijacked".into()),
            ..Default::default()
        };

        let err = service.update_quiz(quiz.id, patch, "someone_else").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_by_owner_persists() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |_| {}).await;
        let patch = UpdateQuizRequest {
            passing_score: Some(90),
            ..Default::default()
        };

        let updated = service.update_quiz(quiz.id, patch, INSTRUCTOR).await.unwrap();
        assert_eq!(updated.passing_score, 90);
        assert_eq!(service.get_quiz_by_id(quiz.id, None).await.unwrap().passing_score, 90);
    }

    #[tokio::test]
    async fn test_update_missing_quiz_is_not_found() {
        let (service, _) = service();
        let err = service
            .update_quiz(42, UpdateQuizRequest::default(), INSTRUCTOR)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unpublished_visibility() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |r| r.is_published = false).await;

        let owner = user(INSTRUCTOR, Role::Instructor);
        let admin = user("admin_1", Role::Admin);
        let stranger = user("student_1", Role::Student);

        assert!(service.get_quiz_by_id(quiz.id, Some(&owner)).await.is_ok());
        assert!(service.get_quiz_by_id(quiz.id, Some(&admin)).await.is_ok());
        assert!(matches!(
            service.get_quiz_by_id(quiz.id, Some(&stranger)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_quiz_by_id(quiz.id, None).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_for_taking_strips_keys_and_requires_publication() {
        let (service, _) = service();
        let draft = published_quiz(&service, |r| r.is_published = false).await;
        assert!(matches!(
            service.get_quiz_for_taking(draft.id, "student_1").await,
            Err(AppError::Forbidden(_))
        ));

        let quiz = published_quiz(&service, |_| {}).await;
        let view = service.get_quiz_for_taking(quiz.id, "student_1").await.unwrap();
        let value = serde_json::to_value(&view).unwrap();
        for q in value["questions"].as_array().unwrap() {
            assert!(q.get("correctAnswer").is_none());
            assert!(q.get("explanation").is_none());
        }
        assert_eq!(view.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_for_taking_shuffle_keeps_question_set() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |r| r.shuffle_questions = true).await;

        let view = service.get_quiz_for_taking(quiz.id, "student_1").await.unwrap();
        let mut ids: Vec<String> = view.questions.into_iter().map(|q| q.id).collect();
        ids.sort();
        assert_eq!(ids, ["q1", "q2"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_hides_quiz() {
        let (service, store) = service();
        let quiz = published_quiz(&service, |_| {}).await;
        for student in ["s1", "s2", "s3"] {
            service.start_attempt(quiz.id, student).await.unwrap();
        }
        assert_eq!(store.attempt_count_for_quiz(quiz.id).await, 3);

        assert!(matches!(
            service.delete_quiz(quiz.id, "s1").await,
            Err(AppError::Forbidden(_))
        ));
        service.delete_quiz(quiz.id, INSTRUCTOR).await.unwrap();

        assert_eq!(store.attempt_count_for_quiz(quiz.id).await, 0);
        assert!(matches!(
            service.get_quiz_by_id(quiz.id, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_unpublished_and_attaches_attempts() {
        let (service, _) = service();
        let published = published_quiz(&service, |_| {}).await;
        published_quiz(&service, |r| r.is_published = false).await;

        let attempt = service.start_attempt(published.id, "s1").await.unwrap();
        service
            .submit_attempt(attempt.id, "s1", Default::default())
            .await
            .unwrap();

        let public = service.list_course_quizzes(COURSE_ID, None, false).await.unwrap();
        assert_eq!(public.len(), 1);
        assert!(public[0].user_attempts.is_none());

        let all = service.list_course_quizzes(COURSE_ID, Some("s1"), true).await.unwrap();
        assert_eq!(all.len(), 2);
        let mine = all[0].user_attempts.as_ref().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].attempt_number, 1);
    }
}
