//! `NativeBindingTransfer`: re-binds native method function pointers,
//! accounting for agent-added method-name prefixes.

use dcevm_core::MethodDescriptor;

/// Strip every prefix in `prefixes` from the front of `name`, repeatedly,
/// matching the original's "recursively search... with a new prefix
/// combination" behavior.
fn strip_prefixes<'a>(name: &'a str, prefixes: &[String]) -> &'a str {
    let mut current = name;
    loop {
        match prefixes.iter().find(|p| current.starts_with(p.as_str())) {
            Some(prefix) => current = &current[prefix.len()..],
            None => return current,
        }
    }
}

/// For each deleted or matched native method in `old_methods`, find its
/// counterpart in `new_methods` (matching unprefixed name + signature) and
/// copy the bound native function pointer across.
///
/// `agent_prefixes` comes from `ManagedRuntime`'s `NativeBindings`
/// collaborator, out of scope for the reference runtime (`InMemoryRuntime`
/// reports none).
pub fn transfer(
    old_methods: &[MethodDescriptor],
    new_methods: &mut [MethodDescriptor],
    agent_prefixes: &[String],
) {
    for old_method in old_methods.iter().filter(|m| m.is_native()) {
        let Some(native_function) = old_method.native_function else {
            continue;
        };
        let old_unprefixed = strip_prefixes(old_method.name.as_str(), agent_prefixes);
        if let Some(new_method) = new_methods.iter_mut().find(|m| {
            strip_prefixes(m.name.as_str(), agent_prefixes) == old_unprefixed
                && m.signature == old_method.signature
        }) {
            new_method.native_function = Some(native_function);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::{MethodModifiers, Symbol};

    fn native_method(name: &str, native_function: Option<u64>) -> MethodDescriptor {
        MethodDescriptor {
            name: Symbol::intern(name),
            signature: Symbol::intern("()V"),
            modifiers: MethodModifiers { is_native: true, ..Default::default() },
            method_id: 0,
            bytecode: vec![],
            native_function,
        }
    }

    #[test]
    fn transfers_binding_across_exact_name_match() {
        let old = vec![native_method("doWork", Some(42))];
        let mut new = vec![native_method("doWork", None)];
        transfer(&old, &mut new, &[]);
        assert_eq!(new[0].native_function, Some(42));
    }

    #[test]
    fn transfers_binding_across_agent_prefix_mismatch() {
        let old = vec![native_method("agent1_doWork", Some(42))];
        let mut new = vec![native_method("doWork", None)];
        transfer(&old, &mut new, &["agent1_".to_string()]);
        assert_eq!(new[0].native_function, Some(42));
    }

    #[test]
    fn no_match_leaves_binding_unset() {
        let old = vec![native_method("doWork", Some(42))];
        let mut new = vec![native_method("somethingElse", None)];
        transfer(&old, &mut new, &[]);
        assert_eq!(new[0].native_function, None);
    }
}
