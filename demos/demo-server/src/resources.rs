//! Demo resources.

use dispatchkit::prelude::*;
use serde_json::{Value, json};

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_resource(
        ResourceDefinition::new("config", "data://config")
            .description("Provides application configuration as JSON.")
            .mime_type("application/json"),
        config,
    )?;

    registry.register_resource(
        ResourceDefinition::new("details", "resource://{name}/details")
            .description("Get details for a specific name."),
        details,
    )?;

    // api://users?version=2&limit=50 -> version=2, limit=50, offset=0
    registry.register_resource(
        ResourceDefinition::new("call_api", "api://{endpoint}{?version,limit,offset}")
            .description("Call API endpoint with pagination.")
            .param(ParameterSpec::integer("version").default_value(1))
            .param(ParameterSpec::integer("limit").default_value(10))
            .param(ParameterSpec::integer("offset").default_value(0)),
        call_api,
    )?;

    registry.register_resource(
        ResourceDefinition::new("user_profile", "users://{user_id}/profile")
            .description("Retrieves a user's profile by ID.")
            .param(ParameterSpec::integer("user_id")),
        user_profile,
    )?;

    Ok(())
}

async fn config(_args: Arguments, _ctx: Context) -> Result<Value, HandlerError> {
    Ok(json!({
        "theme": "dark",
        "version": "1.2.0",
        "features": ["tools", "resources"],
    }))
}

async fn details(args: Arguments, ctx: Context) -> Result<Value, HandlerError> {
    let name: String = args.get("name")?;
    Ok(json!({ "name": name, "accessed_at": ctx.request_id() }))
}

async fn call_api(args: Arguments, _ctx: Context) -> Result<Value, HandlerError> {
    let endpoint: String = args.get("endpoint")?;
    let version: i64 = args.get("version")?;
    let limit: i64 = args.get("limit")?;
    let offset: i64 = args.get("offset")?;
    Ok(json!({
        "endpoint": endpoint,
        "version": version,
        "limit": limit,
        "offset": offset,
    }))
}

async fn user_profile(args: Arguments, _ctx: Context) -> Result<Value, HandlerError> {
    let user_id: i64 = args.get("user_id")?;
    Ok(json!({
        "id": user_id,
        "name": format!("User {user_id}"),
        "status": "active",
    }))
}
