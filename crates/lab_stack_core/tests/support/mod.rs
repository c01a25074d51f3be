#![allow(dead_code)]

use lab_stack_core::assertions::Template;
use lab_stack_core::identity::RoleLayout;
use lab_stack_core::stack::{LabStack, StackConfig, StackDefinition};
use lab_stack_core::storage::BucketSettings;

pub fn config_with_layout(layout: RoleLayout) -> StackConfig {
    StackConfig {
        role_layout: layout,
        ..Default::default()
    }
}

pub fn config_without_auto_delete(layout: RoleLayout) -> StackConfig {
    StackConfig {
        role_layout: layout,
        bucket: BucketSettings {
            auto_delete_objects: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn compose(config: &StackConfig) -> StackDefinition {
    LabStack::compose(config).expect("stack should compose")
}

pub fn synthesize(config: &StackConfig) -> (StackDefinition, Template) {
    let definition = compose(config);
    let template = Template::from_stack(&definition).expect("stack should synthesize");
    (definition, template)
}
