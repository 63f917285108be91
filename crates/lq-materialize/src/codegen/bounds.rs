//! `lq_resource_bounds.h`: integer macros sizing the engine's static arrays.

use super::item::{Banner, Item};
use crate::resource::ResourceCounts;

pub const GUARD: &str = "LQ_RESOURCE_BOUNDS_H_";

pub fn resource_bounds(counts: &ResourceCounts, banner: &Banner) -> Vec<Item> {
    let mut items = vec![
        Item::Banner(banner.clone()),
        Item::Blank,
        Item::GuardOpen(GUARD.into()),
        Item::Blank,
    ];
    items.extend(counts.macros().into_iter().map(|(name, value)| Item::Define {
        name: name.to_string(),
        value: value.to_string(),
    }));
    items.push(Item::Blank);
    items.push(Item::GuardClose(GUARD.into()));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::render::render;
    use crate::resource::{analyze, DEFAULT_RING_BUFFER_DEPTH};

    #[test]
    fn only_integer_macros_between_guards() {
        let topo = lq_resolve::resolve(
            &lq_dts::parse_nodes(
                r#"a: i { compatible = "lq,hw-adc-input"; };
                   o { compatible = "lq,cyclic-output"; source = <&a>; };"#,
            )
            .unwrap(),
        )
        .unwrap();
        let banner = Banner {
            source: "demo.dts".into(),
            fingerprint: "0123456789abcdef".into(),
        };
        let text = render(&resource_bounds(&analyze(&topo, DEFAULT_RING_BUFFER_DEPTH), &banner));
        assert!(text.contains("#define LQ_MAX_SIGNALS 1\n"));
        assert!(text.contains("#define LQ_MAX_CYCLIC_OUTPUTS 1\n"));
        assert!(text.contains("#define LQ_NUM_MERGES 0\n"));
        assert!(text.contains("#define LQ_MAX_MERGES 1\n"));
        assert!(!text.contains("#define LQ_MAX_PIDS 0\n"));
        assert!(text.contains("#define LQ_HW_RINGBUFFER_SIZE 64\n"));
        assert!(text.ends_with("#endif /* LQ_RESOURCE_BOUNDS_H_ */\n"));

        let body = text.split("#define LQ_RESOURCE_BOUNDS_H_\n").nth(1).unwrap();
        for line in body.lines().filter(|l| l.starts_with("#define")) {
            let value = line.rsplit(' ').next().unwrap();
            assert!(value.parse::<u64>().is_ok(), "{line}");
        }
    }
}
