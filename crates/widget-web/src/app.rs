//! Main App Component

use leptos::prelude::*;

use widget_core::{HostEvent, View};

use crate::components::{InstallGuide, SignIn, VisitorDetails};
use crate::controller::Controller;

/// Root application component
#[component]
pub fn App(controller: Controller) -> impl IntoView {
    on_cleanup(move || controller.dispatch(HostEvent::Unmounted));

    view! {
        <div class="App">
            {move || screen(controller.view(), controller)}
        </div>
    }
}

fn screen(view: View, controller: Controller) -> AnyView {
    match view {
        View::NotEmbedded => view! { <InstallGuide /> }.into_any(),
        View::Loading => view! { <p>"Loading…"</p> }.into_any(),
        View::SignIn => view! { <SignIn /> }.into_any(),
        View::AccessDenied => view! {
            <div>
                <p>"Access denied."</p>
                <p>"Probably this application is installed on a different account and you do not have access to it."</p>
            </div>
        }
        .into_any(),
        View::Failed => {
            view! { <p>"Something is wrong. Check developer tools console to see error details."</p> }.into_any()
        }
        View::SelectVisitor => view! { <p>"Please select a visitor."</p> }.into_any(),
        View::FetchingVisitor => view! { <p>"Fetching…"</p> }.into_any(),
        View::Visitor(panel) => view! { <VisitorDetails panel=panel controller=controller /> }.into_any(),
    }
}

/// Shown when the widget settings cannot be loaded
#[component]
pub fn Unconfigured(message: String) -> impl IntoView {
    view! {
        <div class="App">
            <p>{message}</p>
        </div>
    }
}
