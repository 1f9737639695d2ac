pub mod error;

pub mod config;

pub mod backend {
    pub mod traits;
    pub use traits::{Backend, Renderers};

    pub mod external;
    pub mod http;
    pub mod local;
    pub mod markdown;
    pub mod pages;

    #[cfg(test)]
    pub mod fake;
}

pub mod controller {
    pub mod actions;
    pub use actions::Action;

    pub mod content_dispatcher;
    pub use content_dispatcher::{ContentDispatcher, ContentKind};

    pub mod event_loop;
    pub use event_loop::EventLoop;

    pub mod state_coordinator;
    pub use state_coordinator::{DispatchResult, StateCoordinator};
}

pub mod model {
    pub mod path_model;
    pub use path_model::PathModel;

    pub mod read_state;
    pub use read_state::{ReadStateStore, ReadStatus};

    pub mod tree_model;
    pub use tree_model::{TreeDescription, TreeModel, TreeNode};

    pub mod ui_state;
    pub use ui_state::{RedrawFlag, StartupPhase, UIState};
}

pub mod view {
    pub mod icons;

    pub mod theme;

    pub mod content_panel;

    pub mod tree_view;

    pub mod ui;

    pub mod components {
        pub mod content_view;
        pub use content_view::ContentView;
        pub mod sidebar;
        pub use sidebar::SidebarTable;
        pub mod status_bar;
        pub use status_bar::StatusBar;
    }
}

pub mod logging;
pub use logging::Logger;

pub use error::ViewerError;
