pub mod nonce;
pub mod provider;
pub mod settings;

pub use self::nonce::{ NonceAge, NonceError, NonceIssuer, WIDGET_NONCE_ACTION };
pub use self::provider::{ AssetBundle, ConfigurationProvider, LocalizedSettings };
pub use self::settings::{ SettingsError, SettingsStore, VisibilityRule, WidgetSettings };
