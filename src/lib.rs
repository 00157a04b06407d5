//! # BRRTRouter Controller
//!
//! Controller-backed routes for BRRTRouter: routes bound to controller types
//! and their actions, dispatched through a configurable pipeline.
//!
//! ## Overview
//!
//! A *controller* is a request-scoped object exposing *actions*. Each matched
//! request gets a fresh controller instance, runs its lifecycle hooks and
//! listeners, binds the action's parameters through an ordered extractor
//! chain, invokes the action and writes its return value as the response.
//!
//! ## Architecture
//!
//! - **[`controller`]** - Controller traits, self-describing controller types,
//!   actions and their parameters, the controller factory
//! - **[`extractor`]** - Ordered parameter-extraction chain and built-in extractors
//! - **[`listener`]** - Instantiation, initialization and invoke listener lists
//! - **[`handler`]** - Route handlers, the route handler factory and the
//!   frozen dispatch pipeline
//! - **[`registry`]** - Controller catalogue and route discovery
//! - **[`router`]** - Generic and controller-aware routers, reverse routing
//! - **[`application`]** - Configuration facade and the serving service
//! - **[`runtime_config`]** - Settings loaded once at startup
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as ControllerService
//!     participant Router as ControllerRouter
//!     participant Handler as ControllerRouteHandler
//!     participant Factory as ControllerFactory
//!     participant Listeners
//!     participant Chain as ExtractorChain
//!     participant Action
//!
//!     Client->>Service: Request GET /pets/42
//!     Service->>Router: find_route(GET, /pets/42)
//!     Router-->>Service: RouteMatch {id: 42}
//!     Service->>Handler: handle(ctx)
//!     Handler->>Factory: create(Pets)
//!     Handler->>Listeners: instantiation listeners
//!     Handler->>Handler: on_init
//!     Handler->>Listeners: initialization listeners
//!     Handler->>Chain: resolve_arguments(show)
//!     Handler->>Listeners: invoke listeners
//!     Handler->>Action: show(ctx, args)
//!     Action-->>Handler: Some(value)
//!     Handler->>Handler: ResponseWriter.write
//!     Service-->>Client: HandlerResponse
//! ```
//!
//! ### Key Architectural Patterns
//!
//! 1. **Explicit over reflective**: controller types describe their actions;
//!    extractors and factories are assembled explicitly
//! 2. **Fail at startup**: unknown or overloaded action names and bad route
//!    patterns are configuration errors, never request-time surprises
//! 3. **Frozen serving state**: `into_service` consumes the application, so
//!    listener lists and the extractor chain cannot change while serving
//! 4. **Fail-fast dispatch**: the first failing stage ends the request with a
//!    typed [`DispatchError`]
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_controller::controller::{Action, ControllerClass, ControllerDescriptor, ParamKind};
//! use brrtrouter_controller::{Controller, ControllerApplication, Request};
//! use http::Method;
//! use serde_json::json;
//!
//! struct Pets;
//! impl Controller for Pets {}
//!
//! impl ControllerClass for Pets {
//!     fn describe() -> ControllerDescriptor<Self> {
//!         ControllerDescriptor::new(|| Ok(Pets)).path("/pets").action(
//!             Action::new("show", |_c: &mut Pets, _ctx, args| {
//!                 let id: i64 = args.parse(0)?;
//!                 Ok(Some(json!({ "id": id })))
//!             })
//!             .param("id", ParamKind::Integer)
//!             .get("/{id}"),
//!         )
//!     }
//! }
//!
//! let mut app = ControllerApplication::default();
//! app.add_controllers(&[Pets::controller_type()]).unwrap();
//!
//! let service = app.into_service();
//! let response = service.handle(Request::new(Method::GET, "/pets/42")).unwrap();
//! assert_eq!(response.body, json!({ "id": 42 }));
//! ```
//!
//! ## Runtime Considerations
//!
//! Dispatch is synchronous. [`ControllerService`] is `Clone + Send + Sync`
//! and holds no locks; an HTTP transport calls [`ControllerService::handle`]
//! from as many threads as it likes.

pub mod application;
pub mod context;
pub mod controller;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod ids;
pub mod listener;
pub mod logging;
pub mod registry;
pub mod response;
pub mod router;
pub mod runtime_config;

pub use application::{ControllerApplication, ControllerService};
pub use context::{Request, RequestContext};
pub use controller::{Controller, ControllerClass, ControllerType};
pub use error::{ConfigurationError, DispatchError, ExtractionError, InstantiationError};
pub use response::HandlerResponse;
pub use runtime_config::{ControllerSettings, RequiredParameterPolicy, RuntimeMode};
