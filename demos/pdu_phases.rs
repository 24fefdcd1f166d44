use checkkit::elphase::ElphaseParams;
use checkkit::raritan::RaritanPduInlet;
use checkkit::rate::MemoryStore;
use checkkit::section::table_from_str;
use checkkit::{Registry, SectionSet};

// Usage: cargo run --example pdu_phases
//
// Runs the Raritan inlet phase check over a canned SNMP walk and prints
// one status line per discovered phase.

const WALK: &str = "\
1 4 1 2308
1 1 2 430
2 4 1 2142
2 1 2 1730
";

fn main() {
    env_logger::init();

    let sections = SectionSet::new().with("raritan_pdu_inlet", table_from_str(WALK));

    let mut registry = Registry::new();
    registry
        .register(Box::new(RaritanPduInlet {
            params: ElphaseParams::default()
                .with_voltage(220.0, 210.0)
                .with_current(16.0, 20.0),
        }))
        .expect("fresh registry");

    let mut store = MemoryStore::new();
    let services = registry
        .discover("raritan_pdu_inlet", &sections)
        .expect("plugin is registered");
    for service in services {
        let resource = registry
            .run(
                "raritan_pdu_inlet",
                service.item.as_deref(),
                &sections,
                0.0,
                &mut store,
            )
            .expect("plugin is registered");
        if let Some(resource) = resource {
            println!("{}", resource.to_status_string());
        }
    }
}
