use dioxus::prelude::*;

use api::{AuthPhase, BackendConfig};
use ui::{use_auth, AuthProvider, LogoutButton, OAuthButton, ThemeProvider, ThemeSelector};

fn main() {
    dioxus::logger::initialize_default();
    dioxus::launch(App);
}

/// Read the backend settings. Without them the app still starts and every
/// backend call fails with the generic error message.
fn load_config() -> BackendConfig {
    match BackendConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Backend configuration incomplete: {}", e);
            BackendConfig::new("", "")
        }
    }
}

#[component]
fn App() -> Element {
    let config = use_hook(load_config);

    rsx! {
        AuthProvider {
            config,
            ThemeProvider {
                Shell {}
            }
        }
    }
}

/// Header bar: who is signed in, the theme selector and the auth controls.
#[component]
fn Shell() -> Element {
    let auth = use_auth();
    let state = auth();

    rsx! {
        header {
            class: "app-header",
            h1 { "Lernpfad" }
            {match state.phase {
                AuthPhase::Uninitialized | AuthPhase::Loading => rsx! {
                    span { class: "view-muted", "Wird geladen..." }
                },
                AuthPhase::Authenticated => {
                    let name = state.user().map(|u| u.display_name()).unwrap_or_default();
                    rsx! {
                        span { class: "app-user", "{name}" }
                        LogoutButton { class: "btn btn-secondary" }
                    }
                }
                AuthPhase::Unauthenticated => rsx! {
                    div {
                        class: "login-buttons",
                        OAuthButton { provider: "google", class: "login-btn" }
                        OAuthButton { provider: "github", class: "login-btn" }
                        OAuthButton { provider: "apple", class: "login-btn" }
                    }
                },
            }}
        }
        main {
            class: "app-main",
            section {
                h2 { "Darstellung" }
                ThemeSelector {}
            }
        }
    }
}
