//! Validating admission endpoint for Cluster resources.
//!
//! Enforces `spec.name` immutability: the kops cluster name is derived
//! from it, so changing it would orphan the provisioned cluster. All
//! other operations are approved. Served as plain HTTP; TLS is expected
//! to be terminated in front of the pod.

use std::net::SocketAddr;

use axum::{routing::post, Json, Router};
use crds::Cluster;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use tracing::{error, info, warn};

use crate::error::ControllerError;

const NAME_CHANGE_DENIED: &str = "Update rejected, Cluster Spec.Name cannot be updated.";
const UPDATE_APPROVED: &str = "Update approved.";

/// Runs the admission server until the listener fails.
pub async fn serve(bind: SocketAddr) -> Result<(), ControllerError> {
    info!("Starting admission server on {}", bind);
    let app = Router::new().route("/validate", post(validate_handler));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| ControllerError::Admission(format!("bind {bind}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ControllerError::Admission(e.to_string()))?;
    Ok(())
}

async fn validate_handler(
    Json(review): Json<AdmissionReview<Cluster>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<Cluster> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!("Malformed admission review: {}", e);
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(review_cluster(&request).into_review())
}

/// Decides a single admission request.
fn review_cluster(request: &AdmissionRequest<Cluster>) -> AdmissionResponse {
    if request.operation != Operation::Update {
        return AdmissionResponse::from(request);
    }

    let (Some(new), Some(old)) = (&request.object, &request.old_object) else {
        warn!("UPDATE review for {} missing object or oldObject", request.name);
        return AdmissionResponse::invalid(
            "UPDATE review must carry both object and oldObject".to_string(),
        );
    };

    if new.spec.name != old.spec.name {
        info!(
            "Denying update of {}: spec.name change {} -> {}",
            request.name, old.spec.name, new.spec.name
        );
        return AdmissionResponse::from(request).deny(NAME_CHANGE_DENIED);
    }

    let mut response = AdmissionResponse::from(request);
    response.result.message = UPDATE_APPROVED.to_string();
    response
}
