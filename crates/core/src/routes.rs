//! Admin route table and the authentication guard.

use crate::resources::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    List(Resource),
    Profile,
    Settings,
}

/// Outcome of guarding a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(Route),
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Profile => "/profile",
            Route::Settings => "/settings",
            Route::List(resource) => match resource {
                Resource::Doctors => "/doctors",
                Resource::Members => "/members",
                Resource::Appointments => "/appointments",
                Resource::Blogs => "/blogs",
                Resource::Inventory => "/school-health/inventory",
                Resource::Infirmary => "/school-health/infirmary",
                Resource::Reports => "/reports",
            },
        }
    }

    /// Resolve a browser-style path. A trailing slash is ignored; unknown
    /// paths return `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };

        [Route::Login, Route::Dashboard, Route::Profile, Route::Settings]
            .into_iter()
            .chain(Resource::ALL.into_iter().map(Route::List))
            .find(|route| route.path() == normalized)
    }

    pub fn requires_auth(self) -> bool {
        !matches!(self, Route::Login)
    }
}

/// Decide whether a navigation may proceed.
///
/// Signed-out users are sent to the login page; signed-in users hitting
/// the login page are sent to the dashboard.
pub fn guard(route: Route, authenticated: bool) -> RouteDecision {
    match (route.requires_auth(), authenticated) {
        (true, false) => RouteDecision::Redirect(Route::Login),
        (false, true) => RouteDecision::Redirect(Route::Dashboard),
        _ => RouteDecision::Allow,
    }
}
