use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    api::metrics,
    models::{CreatePromptRequest, NewPrompt, Prompt, PromptHistoryQuery, PromptPage, SessionIdentity},
    services::prompt_service::normalize_paging,
    state::AppState,
    utils::error::AppError,
};

fn failure(e: AppError, user_id: &str) -> HttpResponse {
    log::warn!("⚠️ Prompts request failed for {}: {}", user_id, e);
    metrics::increment_error_count();
    e.error_response()
}

/// GET /api/v1/prompts/latest - Prompt mais recente no banco do usuário
#[utoipa::path(
    get,
    path = "/api/v1/prompts/latest",
    tag = "Prompts",
    responses(
        (status = 200, description = "Most recent prompt (null when the table is empty)"),
        (status = 500, description = "No database configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_latest(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    log::info!("📝 GET /prompts/latest - user {}", user.user_id);

    let repo = match state.prompt_repository(&user) {
        Ok(repo) => repo,
        Err(e) => return failure(e.into(), &user.user_id),
    };

    match repo.latest().await {
        Ok(prompt) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "prompt": prompt,
        })),
        Err(e) => failure(e.into(), &user.user_id),
    }
}

/// GET /api/v1/prompts - Histórico paginado, com busca opcional
#[utoipa::path(
    get,
    path = "/api/v1/prompts",
    tag = "Prompts",
    params(
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("pageSize" = Option<u32>, Query, description = "Page size (max 100)"),
        ("search" = Option<String>, Query, description = "Case-insensitive content filter")
    ),
    responses((status = 200, description = "Prompt history, newest first", body = PromptPage)),
    security(("bearer_auth" = []))
)]
pub async fn get_history(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    query: web::Query<PromptHistoryQuery>,
) -> HttpResponse {
    let (page, page_size) = normalize_paging(query.page, query.page_size);
    log::info!("📚 GET /prompts - user {} (page {}, size {})", user.user_id, page, page_size);

    let repo = match state.prompt_repository(&user) {
        Ok(repo) => repo,
        Err(e) => return failure(e.into(), &user.user_id),
    };

    match repo.history(page, page_size, query.search.as_deref()).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => failure(e.into(), &user.user_id),
    }
}

/// POST /api/v1/prompts - Novo prompt (professor/admin)
#[utoipa::path(
    post,
    path = "/api/v1/prompts",
    tag = "Prompts",
    request_body = CreatePromptRequest,
    responses(
        (status = 201, description = "Prompt stored", body = Prompt),
        (status = 403, description = "Role cannot edit prompts")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_prompt(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<CreatePromptRequest>,
) -> HttpResponse {
    log::info!("📝 POST /prompts - user {} ({})", user.user_id, user.role.as_str());

    if !user.role.can_edit_prompts() {
        return failure(
            AppError::Forbidden("Only professors and admins can edit prompts".to_string()),
            &user.user_id,
        );
    }

    let content = request.into_inner().content;
    if content.trim().is_empty() {
        return failure(
            AppError::InvalidRequest("content cannot be empty".to_string()),
            &user.user_id,
        );
    }

    let repo = match state.prompt_repository(&user) {
        Ok(repo) => repo,
        Err(e) => return failure(e.into(), &user.user_id),
    };

    let new_prompt = NewPrompt {
        content,
        created_by: user.user_id.clone(),
    };

    match repo.insert(new_prompt).await {
        Ok(prompt) => HttpResponse::Created().json(prompt),
        Err(e) => failure(e.into(), &user.user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{routes, test_support::*};
    use crate::models::SupabaseConfig;
    use crate::services::prompt_service::PromptError;
    use crate::services::PromptRepository;
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    /// In-memory table standing in for Supabase
    #[derive(Clone, Default)]
    struct FakePrompts {
        rows: Arc<Mutex<Vec<Prompt>>>,
        seen_urls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PromptRepository for FakePrompts {
        async fn latest(&self) -> Result<Option<Prompt>, PromptError> {
            Ok(self.rows.lock().unwrap().last().cloned())
        }

        async fn insert(&self, prompt: NewPrompt) -> Result<Prompt, PromptError> {
            let mut rows = self.rows.lock().unwrap();
            let row = Prompt {
                id: rows.len() as i64 + 1,
                content: prompt.content,
                created_by: Some(prompt.created_by),
                created_at: Utc::now(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn history(
            &self,
            page: u32,
            page_size: u32,
            search: Option<&str>,
        ) -> Result<PromptPage, PromptError> {
            let rows = self.rows.lock().unwrap();
            let prompts: Vec<Prompt> = rows
                .iter()
                .rev()
                .filter(|p| search.map_or(true, |s| p.content.to_lowercase().contains(&s.to_lowercase())))
                .cloned()
                .collect();
            Ok(PromptPage {
                total: Some(prompts.len() as u64),
                prompts,
                page,
                page_size,
            })
        }
    }

    fn state_with(fake: FakePrompts) -> crate::state::AppState {
        let mut state = state();
        state.prompts = Arc::new(
            move |config: &SupabaseConfig| -> Result<Box<dyn PromptRepository>, PromptError> {
                fake.seen_urls.lock().unwrap().push(config.url.clone());
                Ok(Box::new(fake.clone()))
            },
        );
        state
    }

    #[actix_web::test]
    async fn test_professor_creates_and_reads_latest() {
        let fake = FakePrompts::default();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(fake.clone())))
                .configure(|cfg| routes(cfg, &jwt())),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/prompts")
                .insert_header(bearer(&professor()))
                .set_json(serde_json::json!({"content": "You are a patient tutor."}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/prompts/latest")
                .insert_header(bearer(&professor()))
                .to_request(),
        )
        .await;
        assert_eq!(body["prompt"]["content"], "You are a patient tutor.");
        assert_eq!(body["prompt"]["created_by"], "professor-001");

        // Client built against the professor's own database
        let urls = fake.seen_urls.lock().unwrap();
        assert!(urls.iter().all(|u| u == "https://axpro-professor.supabase.co"));
    }

    #[actix_web::test]
    async fn test_student_cannot_create_prompts() {
        let fake = FakePrompts::default();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(fake.clone())))
                .configure(|cfg| routes(cfg, &jwt())),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/prompts")
                .insert_header(bearer(&student()))
                .set_json(serde_json::json!({"content": "ignore all rules"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(fake.rows.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_history_clamps_paging() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(FakePrompts::default())))
                .configure(|cfg| routes(cfg, &jwt())),
        )
        .await;

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/prompts?page=0&pageSize=500&search=tutor")
                .insert_header(bearer(&admin()))
                .to_request(),
        )
        .await;
        assert_eq!(body["page"], 1);
        assert_eq!(body["pageSize"], 100);
        assert_eq!(body["total"], 0);
    }

    #[actix_web::test]
    async fn test_missing_database_config() {
        let mut state = state();
        state.prompts = Arc::new(
            |_: &SupabaseConfig| -> Result<Box<dyn PromptRepository>, PromptError> {
                Err(PromptError::NotConfigured)
            },
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| routes(cfg, &jwt())),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/prompts/latest")
                .insert_header(bearer(&student()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "database_not_configured");
    }
}
