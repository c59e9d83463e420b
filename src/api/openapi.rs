use super::handlers::{auth, health, invites, lists, me};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::me))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::otp::send_otp))
        .routes(routes!(auth::otp::verify_otp))
        .routes(routes!(me::patch_profile, me::delete_account))
        .routes(routes!(me::change_password))
        .routes(routes!(lists::get_lists, lists::create_list))
        .routes(routes!(
            lists::get_list,
            lists::patch_list,
            lists::delete_list
        ))
        .routes(routes!(lists::members::get_members))
        .routes(routes!(lists::members::remove_member))
        .routes(routes!(lists::items::get_items, lists::items::create_item))
        .routes(routes!(lists::items::patch_item, lists::items::delete_item))
        .routes(routes!(
            lists::messages::get_messages,
            lists::messages::post_message
        ))
        .routes(routes!(lists::mentions::get_mentions))
        .routes(routes!(invites::list_invites, invites::create_invite))
        .routes(routes!(invites::patch_invite, invites::delete_invite))
        .routes(routes!(invites::invite_details))
        .routes(routes!(invites::accept_invite));

    let mut cartmate_tag = Tag::new("cartmate");
    cartmate_tag.description = Some("Collaborative shopping list API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Registration, login, and email verification".to_string());

    let mut lists_tag = Tag::new("lists");
    lists_tag.description = Some("Shopping lists, items, members, and messages".to_string());

    let mut invites_tag = Tag::new("invites");
    invites_tag.description = Some("Invite links for sharing lists".to_string());

    router.get_openapi_mut().tags = Some(vec![cartmate_tag, auth_tag, lists_tag, invites_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Cartmate"));
            assert_eq!(contact.email.as_deref(), Some("team@cartmate.app"));
        }
    }

    #[test]
    fn openapi_documents_core_paths() {
        let spec = openapi();
        let paths = spec.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/v1/auth/register"));
        assert!(paths.contains_key("/v1/auth/login"));
        assert!(paths.contains_key("/v1/lists"));
        assert!(paths.contains_key("/v1/lists/{id}/items/{item_id}"));
        assert!(paths.contains_key("/v1/lists/{id}/mentions"));
        assert!(paths.contains_key("/v1/invites/{token}/accept"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Cartmate <team@cartmate.app>"),
            (Some("Team Cartmate"), Some("team@cartmate.app"))
        );
        assert_eq!(parse_author("Team Cartmate"), (Some("Team Cartmate"), None));
        assert_eq!(parse_author("<team@cartmate.app>"), (None, Some("team@cartmate.app")));
    }
}
