use std::fmt;
use std::sync::{Arc, LazyLock};

use morph_api::TypeRef;
use serde::Deserialize;

use crate::error::ConversionError;
use crate::generic::TypeBindings;
use crate::handler::{self, FieldHandler, HandlerList};
use crate::policy::{ExcludedFields, ExpandableFields, SimpleConverters};
use crate::strategy::{
    AliasStrategy, ConversionStrategy, DottedPathStrategy, ExactNameStrategy,
    FlattenedPathStrategy,
};

pub type StrategyList = Arc<[Arc<dyn ConversionStrategy>]>;

static DEFAULT_HANDLERS: LazyLock<HandlerList> =
    LazyLock::new(|| handler::default_handlers().into());

static DEFAULT_STRATEGIES: LazyLock<StrategyList> = LazyLock::new(|| {
    let strategies: Vec<Arc<dyn ConversionStrategy>> = vec![
        Arc::new(ExactNameStrategy),
        Arc::new(AliasStrategy),
        Arc::new(DottedPathStrategy),
        Arc::new(FlattenedPathStrategy),
    ];
    strategies.into()
});

static DEFAULT_CONFIG: LazyLock<Arc<Configuration>> = LazyLock::new(|| {
    Arc::new(Configuration {
        handlers: DEFAULT_HANDLERS.clone(),
        strategies: DEFAULT_STRATEGIES.clone(),
        excluded: ExcludedFields::default(),
        expandable: ExpandableFields::default(),
        simple_converters: SimpleConverters::default(),
        bindings: TypeBindings::default(),
    })
});

/// Immutable bundle of handlers, strategies, inclusion policy and type
/// bindings.
///
/// Built once per top-level conversion and shared by reference. A build that
/// comes out structurally equal to the default returns the default instance.
#[derive(Clone)]
pub struct Configuration {
    handlers: HandlerList,
    strategies: StrategyList,
    excluded: ExcludedFields,
    expandable: ExpandableFields,
    simple_converters: SimpleConverters,
    bindings: TypeBindings,
}

impl Configuration {
    /// The process-wide default configuration.
    pub fn default_config() -> Arc<Configuration> {
        DEFAULT_CONFIG.clone()
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Compose a configuration.
    ///
    /// With custom handlers the chain is: built-in guards, the custom
    /// handlers, the built-in conversions. Custom strategies run before the
    /// built-in ones.
    pub fn of(
        handlers: Vec<Arc<dyn FieldHandler>>,
        strategies: Vec<Arc<dyn ConversionStrategy>>,
        excluded: ExcludedFields,
        expandable: ExpandableFields,
        simple_converters: SimpleConverters,
    ) -> Arc<Configuration> {
        let handlers: HandlerList = if handlers.is_empty() {
            DEFAULT_HANDLERS.clone()
        } else {
            let mut chain = handler::before_default();
            chain.extend(handlers);
            chain.extend(handler::after_default());
            chain.into()
        };
        let strategies: StrategyList = if strategies.is_empty() {
            DEFAULT_STRATEGIES.clone()
        } else {
            let mut chain = strategies;
            chain.extend(DEFAULT_STRATEGIES.iter().cloned());
            chain.into()
        };
        let config = Configuration {
            handlers,
            strategies,
            excluded,
            expandable,
            simple_converters,
            bindings: TypeBindings::default(),
        };
        if config == **DEFAULT_CONFIG {
            return DEFAULT_CONFIG.clone();
        }
        Arc::new(config)
    }

    /// Configuration from parsed settings, default handlers and strategies.
    pub fn from_settings(settings: &ConversionSettings) -> Arc<Configuration> {
        let excluded = if settings.exclude_all {
            if !settings.excluded_fields.is_empty() {
                tracing::warn!("excluded_fields ignored because exclude_all is set");
            }
            ExcludedFields::all()
        } else {
            ExcludedFields::named(settings.excluded_fields.iter().cloned())
        };
        let expandable = ExpandableFields::from_list(settings.expandable_fields.clone());
        Self::of(Vec::new(), Vec::new(), excluded, expandable, SimpleConverters::default())
    }

    /// Copy sharing the handler and strategy lists, with `name` bound to `ty`.
    pub fn copy_with(&self, name: &'static str, ty: TypeRef) -> Arc<Configuration> {
        Arc::new(Configuration {
            bindings: self.bindings.with(name, ty),
            ..self.clone()
        })
    }

    pub fn is_default(&self) -> bool {
        *self == **DEFAULT_CONFIG
    }

    pub fn handlers(&self) -> &HandlerList {
        &self.handlers
    }

    pub fn strategies(&self) -> &StrategyList {
        &self.strategies
    }

    pub fn excluded(&self) -> &ExcludedFields {
        &self.excluded
    }

    pub fn expandable(&self) -> &ExpandableFields {
        &self.expandable
    }

    pub fn simple_converters(&self) -> &SimpleConverters {
        &self.simple_converters
    }

    pub fn bindings(&self) -> &TypeBindings {
        &self.bindings
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        let same_handlers = Arc::ptr_eq(&self.handlers, &other.handlers)
            || self
                .handlers
                .iter()
                .map(|h| h.name())
                .eq(other.handlers.iter().map(|h| h.name()));
        let same_strategies = Arc::ptr_eq(&self.strategies, &other.strategies)
            || self
                .strategies
                .iter()
                .map(|s| s.name())
                .eq(other.strategies.iter().map(|s| s.name()));
        same_handlers
            && same_strategies
            && self.excluded == other.excluded
            && self.expandable == other.expandable
            && self.simple_converters == other.simple_converters
            && self.bindings == other.bindings
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("strategies", &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("excluded", &self.excluded)
            .field("expandable", &self.expandable)
            .field("simple_converters", &self.simple_converters)
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[derive(Default)]
pub struct ConfigurationBuilder {
    handlers: Vec<Arc<dyn FieldHandler>>,
    strategies: Vec<Arc<dyn ConversionStrategy>>,
    excluded: ExcludedFields,
    expandable: ExpandableFields,
    simple_converters: SimpleConverters,
}

impl ConfigurationBuilder {
    pub fn handler(mut self, handler: impl FieldHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn strategy(mut self, strategy: impl ConversionStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn excluded(mut self, excluded: ExcludedFields) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn expandable(mut self, expandable: ExpandableFields) -> Self {
        self.expandable = expandable;
        self
    }

    pub fn simple_converters(mut self, converters: SimpleConverters) -> Self {
        self.simple_converters = converters;
        self
    }

    pub fn build(self) -> Arc<Configuration> {
        Configuration::of(
            self.handlers,
            self.strategies,
            self.excluded,
            self.expandable,
            self.simple_converters,
        )
    }
}

/// Inclusion policy as written in a settings file.
///
/// ```toml
/// exclude_all = false
/// excluded_fields = ["password"]
/// expandable_fields = ["orders"]   # omit = expand all, [] = expand none
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversionSettings {
    #[serde(default)]
    pub exclude_all: bool,

    #[serde(default)]
    pub excluded_fields: Vec<String>,

    #[serde(default)]
    pub expandable_fields: Option<Vec<String>>,
}

impl ConversionSettings {
    /// Parse settings from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConversionError> {
        toml::from_str(toml_str).map_err(|e| ConversionError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionContext;
    use crate::field::FieldRef;
    use crate::handler::FieldHandlerResult;

    #[derive(Debug)]
    struct Noop;

    impl FieldHandler for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn handle(
            &self,
            _source: &FieldRef<'_>,
            _destination: &mut FieldRef<'_>,
            _ctx: &mut ConversionContext,
        ) -> Result<FieldHandlerResult, ConversionError> {
            Ok(FieldHandlerResult::Skip)
        }
    }

    #[test]
    fn test_plain_build_reuses_default() {
        let config = Configuration::builder().build();
        assert!(Arc::ptr_eq(&config, &Configuration::default_config()));
        assert!(config.is_default());
    }

    #[test]
    fn test_custom_handler_spliced_after_guards() {
        let config = Configuration::builder().handler(Noop).build();
        assert!(!config.is_default());
        let names: Vec<_> = config.handlers().iter().map(|h| h.name()).collect();
        let guards = handler::before_default().len();
        assert_eq!(names[guards], "noop");
        assert_eq!(names.last(), Some(&"object"));
        assert_eq!(names.len(), handler::default_handlers().len() + 1);
    }

    #[test]
    fn test_copy_with_shares_lists() {
        let base = Configuration::default_config();
        let bound = base.copy_with("T", TypeRef::String);
        assert!(Arc::ptr_eq(base.handlers(), bound.handlers()));
        assert_eq!(bound.bindings().get("T"), Some(&TypeRef::String));
        assert!(!bound.is_default());
        assert_eq!(*bound, *base.copy_with("T", TypeRef::String));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = ConversionSettings::parse(
            r#"
            excluded_fields = ["password"]
            expandable_fields = []
            "#,
        )
        .unwrap();
        let config = Configuration::from_settings(&settings);
        assert!(config.excluded().excludes("password"));
        assert_eq!(config.expandable(), &ExpandableFields::None);

        let defaults = ConversionSettings::parse("").unwrap();
        assert!(Configuration::from_settings(&defaults).is_default());
    }

    #[test]
    fn test_settings_reject_malformed_toml() {
        let err = ConversionSettings::parse("excluded_fields = 3").unwrap_err();
        assert!(matches!(err, ConversionError::Config(_)));
    }
}
