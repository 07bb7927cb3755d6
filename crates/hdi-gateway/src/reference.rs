//! Read-only R&D reference endpoints and the prompt template catalogue

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use hdi_core::media::TEMPLATES;

use crate::server::GatewayState;

pub async fn all_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let data = &state.reference;
    Json(serde_json::json!({
        "papers": data.papers,
        "equipment": data.equipment,
        "materials": data.materials,
        "institutions": data.institutions,
        "categories": data.categories,
        "countries": data.countries,
        "lastUpdated": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn papers_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let papers = &state.reference.papers;
    Json(serde_json::json!({ "papers": papers, "count": papers.len() }))
}

pub async fn equipment_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let equipment = &state.reference.equipment;
    Json(serde_json::json!({ "equipment": equipment, "count": equipment.len() }))
}

pub async fn materials_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let materials = &state.reference.materials;
    Json(serde_json::json!({ "materials": materials, "count": materials.len() }))
}

pub async fn institutions_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let institutions = &state.reference.institutions;
    Json(serde_json::json!({ "institutions": institutions, "count": institutions.len() }))
}

/// Engineering prompt templates in detection order
pub async fn master_prompts_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "prompts": TEMPLATES,
        "source": "default",
    }))
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::server::tests::{call, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rnd_all() {
        let (status, json) = call(build_router(test_state()), get("/api/rnd/all")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["papers"].as_array().unwrap().len(), 6);
        assert!(json["countries"].as_array().unwrap().iter().any(|c| c == "Indonesia"));
        assert!(json["lastUpdated"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_rnd_collections_carry_counts() {
        let app = build_router(test_state());
        for (uri, key, count) in [
            ("/api/rnd/papers", "papers", 6),
            ("/api/rnd/equipment", "equipment", 3),
            ("/api/rnd/materials", "materials", 3),
            ("/api/rnd/institutions", "institutions", 3),
        ] {
            let (status, json) = call(app.clone(), get(uri)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(json["count"], count, "{uri}");
            assert_eq!(json[key].as_array().unwrap().len(), count, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_master_prompts() {
        let (_, json) = call(build_router(test_state()), get("/api/prompts/master")).await;
        let prompts = json["prompts"].as_array().unwrap();
        assert_eq!(prompts.len(), 4);
        assert_eq!(prompts[0]["id"], "engineering_cad");
        assert_eq!(json["source"], "default");
    }
}
