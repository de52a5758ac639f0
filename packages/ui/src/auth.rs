//! Authentication context and hooks for the UI.

use api::{
    AuthDriver, AuthRedirects, AuthService, AuthState, BackendClient, BackendConfig, ProfileApi,
};
use dioxus::prelude::*;
use dioxus_free_icons::icons::fa_brands_icons::{FaApple, FaGithub, FaGoogle};
use dioxus_free_icons::Icon;

use crate::prefs::{make_preference_store, SharedStore};

/// Get the current authentication state.
/// Returns a signal that updates on every sign-in, sign-out and token refresh.
pub fn use_auth() -> Signal<AuthState> {
    use_context::<Signal<AuthState>>()
}

pub fn use_auth_service() -> AuthService<BackendClient> {
    use_context::<AuthService<BackendClient>>()
}

pub fn use_profile_api() -> ProfileApi<BackendClient> {
    use_context::<ProfileApi<BackendClient>>()
}

/// Provider component that owns the backend client and the auth context.
/// Wrap your app with this component to enable authentication.
///
/// Also provides the [`SharedStore`] so other providers persist into the same
/// place as the session.
#[component]
pub fn AuthProvider(config: BackendConfig, children: Element) -> Element {
    let auth_state = use_signal(AuthState::default);

    let storage: SharedStore = use_hook(make_preference_store);
    let backend = use_hook(|| BackendClient::with_storage(config.clone(), storage.clone()));
    let auth = use_hook(|| {
        AuthService::new(backend.clone()).with_redirects(AuthRedirects::from_config(&config))
    });
    let profiles = use_hook(|| ProfileApi::new(backend.clone()));

    // Start the auth context once; it stops when the provider unmounts
    let handle = use_hook(|| {
        let (handle, driver) = AuthDriver::new();
        let auth = auth.clone();
        spawn(async move {
            let mut auth_state = auth_state;
            driver
                .run(&auth, move |state| auth_state.set(state.clone()))
                .await;
        });
        handle
    });
    use_drop(move || handle.unmount());

    use_context_provider(|| storage);
    use_context_provider(|| auth_state);
    use_context_provider(|| auth);
    use_context_provider(|| profiles);

    rsx! {
        {children}
    }
}

/// Navigate the browser to `url`.
fn redirect(url: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().set_href(url) {
                tracing::error!("Failed to navigate to {}: {:?}", url, e);
            }
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::info!("Open {} in a browser to continue", url);
    }
}

/// Button to start an OAuth sign-in with `provider` (`google`, `github` or
/// `apple`).
#[component]
pub fn OAuthButton(
    provider: String,
    #[props(default = "".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let auth = use_auth_service();
    let mut loading = use_signal(|| false);
    let mut error = use_signal(|| None::<String>);

    let provider_clone = provider.clone();
    let onclick = move |_| {
        let auth = auth.clone();
        let provider = provider_clone.clone();
        async move {
            loading.set(true);
            error.set(None);
            match auth.sign_in_with_oauth(&provider).await {
                // Loading stays on while the browser leaves the page
                Ok(target) => redirect(&target.url),
                Err(e) => {
                    tracing::error!("Failed to start {} sign-in: {}", provider, e);
                    error.set(Some(e.message()));
                    loading.set(false);
                }
            }
        }
    };

    let text = if label.is_empty() {
        provider_label(&provider)
    } else {
        label.clone()
    };

    rsx! {
        button {
            class: "{class}",
            disabled: loading(),
            onclick: onclick,
            {provider_icon(&provider)}
            if loading() {
                span { "Weiterleitung..." }
            } else {
                span { "{text}" }
            }
        }
        if let Some(message) = error() {
            p { class: "auth-error", "{message}" }
        }
    }
}

fn provider_label(provider: &str) -> String {
    match provider.parse::<api::models::OAuthProvider>() {
        Ok(p) => format!("Weiter mit {}", p.label()),
        Err(_) => provider.to_string(),
    }
}

fn provider_icon(provider: &str) -> Element {
    match provider.to_ascii_lowercase().as_str() {
        "google" => rsx! { Icon { icon: FaGoogle, width: 14, height: 14 } },
        "github" => rsx! { Icon { icon: FaGithub, width: 14, height: 14 } },
        "apple" => rsx! { Icon { icon: FaApple, width: 14, height: 14 } },
        _ => rsx! {},
    }
}

/// Button to sign out the current user.
///
/// Clicks while a sign-out is in flight are ignored.
#[component]
pub fn LogoutButton(
    #[props(default = "Abmelden".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
    #[props(default = "/".to_string())] redirect_to: String,
) -> Element {
    let auth = use_auth_service();
    let mut signing_out = use_signal(|| false);

    let onclick = move |_| {
        let auth = auth.clone();
        let redirect_to = redirect_to.clone();
        async move {
            if signing_out() {
                return;
            }
            signing_out.set(true);
            match auth.sign_out().await {
                Ok(()) => redirect(&redirect_to),
                Err(e) => tracing::error!("Sign-out failed: {}", e),
            }
            signing_out.set(false);
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: signing_out(),
            onclick: onclick,
            "{label}"
        }
    }
}
