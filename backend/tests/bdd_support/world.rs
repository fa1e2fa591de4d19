//! Shared world for HTTP behaviour suites.
//!
//! Each scenario owns a [`TestApp`] and an actix system; requests are driven
//! synchronously through `actix_web::test` so step functions stay plain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use actix_rt::SystemRunner;
use actix_web::test::{self, TestRequest};
use serde_json::Value;
use tourbook::domain::{Role, Tour, User};
use tourbook::test_support::http::{TestApp, bearer};

pub(crate) struct ApiWorld {
    system: SystemRunner,
    pub(crate) app: TestApp,
    pub(crate) users: HashMap<String, (User, String)>,
    pub(crate) tour: Option<Tour>,
    pub(crate) last_status: Option<u16>,
    pub(crate) last_body: Value,
}

pub(crate) type SharedWorld = Rc<RefCell<ApiWorld>>;

pub(crate) struct WorldFixture {
    world: SharedWorld,
}

impl WorldFixture {
    pub(crate) fn world(&self) -> SharedWorld {
        self.world.clone()
    }
}

pub(crate) fn world() -> WorldFixture {
    WorldFixture {
        world: Rc::new(RefCell::new(ApiWorld {
            system: actix_rt::System::new(),
            app: TestApp::new(),
            users: HashMap::new(),
            tour: None,
            last_status: None,
            last_body: Value::Null,
        })),
    }
}

/// Seed a user called `name` with `role` and remember their token.
pub(crate) fn seed_user(world: &SharedWorld, name: &str, role: &str) {
    let role: Role = role
        .parse()
        .unwrap_or_else(|err| panic!("unknown role {role}: {err}"));
    let email = format!("{}@example.com", name.to_lowercase());
    let seeded = {
        let ctx = world.borrow();
        ctx.system.block_on(ctx.app.seed_user(name, &email, role))
    };
    world.borrow_mut().users.insert(name.to_owned(), seeded);
}

pub(crate) fn seed_tour(world: &SharedWorld, name: &str) {
    let tour = {
        let ctx = world.borrow();
        ctx.system.block_on(ctx.app.seed_tour(name))
    };
    world.borrow_mut().tour = Some(tour);
}

pub(crate) fn user(world: &SharedWorld, name: &str) -> User {
    world
        .borrow()
        .users
        .get(name)
        .map(|(user, _)| user.clone())
        .unwrap_or_else(|| panic!("user {name} was not seeded"))
}

pub(crate) fn tour(world: &SharedWorld) -> Tour {
    world.borrow().tour.clone().expect("tour was not seeded")
}

/// Attach the bearer token of `name`, if given.
pub(crate) fn as_user(world: &SharedWorld, name: Option<&str>, req: TestRequest) -> TestRequest {
    match name {
        Some(name) => {
            let ctx = world.borrow();
            let (_, token) = ctx
                .users
                .get(name)
                .unwrap_or_else(|| panic!("user {name} was not seeded"));
            req.insert_header(bearer(token))
        }
        None => req,
    }
}

/// Send `req` through the full API and record the status and JSON body.
pub(crate) fn send(world: &SharedWorld, req: TestRequest) {
    let (status, body) = {
        let ctx = world.borrow();
        ctx.system.block_on(async {
            let app = test::init_service(ctx.app.app()).await;
            let res = test::call_service(&app, req.to_request()).await;
            let status = res.status().as_u16();
            let bytes = test::read_body(res).await;
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, body)
        })
    };
    let mut ctx = world.borrow_mut();
    ctx.last_status = Some(status);
    ctx.last_body = body;
}

pub(crate) fn assert_status(world: &SharedWorld, expected: u16) {
    let ctx = world.borrow();
    assert_eq!(
        ctx.last_status,
        Some(expected),
        "unexpected response body: {}",
        ctx.last_body
    );
}

pub(crate) fn assert_error_code(world: &SharedWorld, expected: &str) {
    let ctx = world.borrow();
    assert_eq!(
        ctx.last_body.get("code").and_then(Value::as_str),
        Some(expected),
        "unexpected response body: {}",
        ctx.last_body
    );
}
