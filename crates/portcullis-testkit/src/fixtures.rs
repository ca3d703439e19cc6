//! Test fixtures and helpers.
//!
//! The standard site used across integration tests:
//!
//! | path             | middleware        | requirement              |
//! |------------------|-------------------|--------------------------|
//! | `/`              |                   |                          |
//! | `/login`         | `login`           |                          |
//! | `/403`           |                   |                          |
//! | `/dashboard`     | `login`           |                          |
//! | `/admin`         | `login`, `access` | role `Admin`             |
//! | `/admin/users`   | `access`          | permission `user.manage` |
//! | `/reports`       | `access`          | role `Admin`             |
//! | `/posts/:id`     | `access`          | permission `post.view`   |

use portcullis::router::{AccessRequirement, RouteRecord, RouteTable};
use portcullis::{Access, AccessConfig, LoginInfo, Location, RoleSpec};

/// Install a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn standard_routes() -> RouteTable {
    RouteTable::new(vec![
        RouteRecord::new("/").name("home"),
        RouteRecord::new("/login").name("login").middleware("login"),
        RouteRecord::new("/403").name("forbidden"),
        RouteRecord::new("/dashboard").name("dashboard").middleware("login"),
        RouteRecord::new("/admin")
            .name("admin")
            .middleware("login")
            .middleware("access")
            .access(AccessRequirement::roles("Admin"))
            .child(RouteRecord::new("").name("admin-index"))
            .child(
                RouteRecord::new("users")
                    .name("admin-users")
                    .middleware("access")
                    .access(AccessRequirement::permissions("user.manage")),
            ),
        RouteRecord::new("/reports")
            .name("reports")
            .middleware("access")
            .access(AccessRequirement::roles("Admin")),
        RouteRecord::new("/posts/:id")
            .name("post")
            .middleware("access")
            .access(AccessRequirement::permissions("post.view")),
    ])
    .expect("standard route table is valid")
}

/// Routing enabled, with login, default and deny destinations.
pub fn standard_config() -> AccessConfig {
    AccessConfig {
        router: true,
        login_route: Some(Location::new("/login")),
        default_route: Some(Location::new("/dashboard")),
        permission_deny_redirect_route: Some(Location::new("/403")),
        ..AccessConfig::default()
    }
}

/// An [`Access`] over the standard routes.
pub struct AccessFixture {
    pub access: Access,
}

impl AccessFixture {
    /// Standard config and routes.
    pub fn new() -> Self {
        Self::with_config(standard_config())
    }

    /// Standard routes with no deny destination, so denials cancel.
    pub fn without_deny_route() -> Self {
        Self::with_config(AccessConfig {
            permission_deny_redirect_route: None,
            ..standard_config()
        })
    }

    pub fn with_config(config: AccessConfig) -> Self {
        let access = Access::builder()
            .config(config)
            .routes(standard_routes())
            .build()
            .expect("fixture config is valid");
        Self { access }
    }

    /// Log in with an actor id and roles.
    pub fn login_as(&self, actor_id: u64, roles: impl Into<RoleSpec>) {
        self.access.set_login_user_info(
            LoginInfo::new()
                .roles(roles)
                .actor_id(actor_id)
                .logged_in(true),
        );
    }
}

impl Default for AccessFixture {
    fn default() -> Self {
        Self::new()
    }
}
