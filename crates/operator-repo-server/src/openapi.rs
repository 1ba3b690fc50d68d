use operator_repo_api::ErrorBody;
use operator_repo_storage::{IoField, Operator, OperatorInput, OperatorPage, OperatorPatch};
use utoipa::OpenApi;

use crate::handlers;

/// OpenAPI document served at `/doc`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Analytics Operator Repo API",
        version = "0.1",
        description = "Registry of analytics operators and their inputs, outputs and config values"
    ),
    paths(
        handlers::create_operator,
        handlers::list_operators,
        handlers::delete_operators,
        handlers::read_operator,
        handlers::update_operator,
        handlers::delete_operator
    ),
    components(schemas(
        Operator,
        OperatorInput,
        OperatorPatch,
        OperatorPage,
        IoField,
        ErrorBody
    )),
    tags((name = "operator", description = "Operator registry"))
)]
pub struct ApiDoc;
