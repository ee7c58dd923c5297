pub mod dispatcher;
pub mod session;

pub use dispatcher::ChatDispatcher;
pub use session::ChatSession;
