//! Theme provider, hook and selector.

use api::theme::sync_theme_to_profile;
use api::{BackendClient, ProfileApi, Theme, ThemeContext};
use dioxus::prelude::*;
use dioxus_free_icons::icons::fa_solid_icons::{FaCircleHalfStroke, FaMoon, FaSun};
use dioxus_free_icons::Icon;

use crate::auth::{use_auth, use_profile_api};
use crate::prefs::{make_preference_store, SharedStore};

pub type ThemeSignal = Signal<ThemeContext<SharedStore>>;

pub fn use_theme() -> ThemeSignal {
    use_context::<ThemeSignal>()
}

/// Provider for the theme preference. Must sit inside `AuthProvider`.
///
/// Applies the resolved theme to the document whenever it changes and adopts
/// the profile's theme once a user is signed in.
#[component]
pub fn ThemeProvider(children: Element) -> Element {
    let theme = use_signal(|| {
        let storage = try_consume_context::<SharedStore>().unwrap_or_else(make_preference_store);
        ThemeContext::load(storage)
    });
    let auth = use_auth();
    let profiles = use_profile_api();

    use_effect(move || apply_theme(theme.read().preference()));

    // Re-runs whenever the auth state changes
    let _ = use_resource(move || {
        let profiles = profiles.clone();
        async move {
            if !auth.read().is_authenticated() {
                return;
            }
            let mut theme = theme;
            match profiles.get_profile().await {
                Ok(Some(profile)) => theme.write().hydrate_from_profile(&profile),
                Ok(None) => tracing::debug!("No profile yet, keeping local theme"),
                Err(e) => tracing::warn!("Failed to load profile theme: {}", e),
            }
        }
    });

    use_context_provider(|| theme);

    rsx! {
        {children}
    }
}

/// Set the `data-theme` attribute on `<html>` to the resolved theme.
pub fn apply_theme(preference: Theme) {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        let prefers_dark = window
            .match_media("(prefers-color-scheme: dark)")
            .ok()
            .flatten()
            .map(|query| query.matches())
            .unwrap_or(false);
        let resolved = preference.resolve(prefers_dark);
        if let Some(root) = window.document().and_then(|d| d.document_element()) {
            if let Err(e) = root.set_attribute("data-theme", resolved.as_str()) {
                tracing::error!("Failed to apply theme: {:?}", e);
            }
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::debug!("Theme preference is now {}", preference);
    }
}

/// Store `value` locally, then save it to the profile in the background.
fn choose(mut theme: ThemeSignal, value: Theme, profiles: ProfileApi<BackendClient>) {
    if let Err(e) = theme.write().set_preference(value.as_str()) {
        tracing::error!("Failed to set theme: {}", e);
        return;
    }
    spawn(async move {
        sync_theme_to_profile(value, &profiles).await;
    });
}

fn theme_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "Hell",
        Theme::Dark => "Dunkel",
        Theme::System => "System",
    }
}

fn theme_icon(theme: Theme) -> Element {
    match theme {
        Theme::Light => rsx! { Icon { icon: FaSun, width: 14, height: 14 } },
        Theme::Dark => rsx! { Icon { icon: FaMoon, width: 14, height: 14 } },
        Theme::System => rsx! { Icon { icon: FaCircleHalfStroke, width: 14, height: 14 } },
    }
}

#[component]
pub fn ThemeSelector() -> Element {
    let theme = use_theme();
    let profiles = use_profile_api();
    let current = theme.read().preference();

    rsx! {
        div {
            class: "flex flex-wrap gap-3",
            for option in Theme::ALL {
                label {
                    key: "{option}",
                    class: if current == option { "theme-card theme-card-active" } else { "theme-card" },
                    onclick: {
                        let profiles = profiles.clone();
                        move |_| choose(theme, option, profiles.clone())
                    },
                    {theme_icon(option)}
                    span { "{theme_label(option)}" }
                }
            }
        }
        p {
            class: "view-muted mt-2",
            "Wähle das Erscheinungsbild von Lernpfad. System folgt der Einstellung deines Betriebssystems."
        }
    }
}
