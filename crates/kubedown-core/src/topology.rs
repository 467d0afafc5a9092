//! Network topology for the units of one pod

use crate::app::{NetworkMode, PodUnits};

/// Assign network modes so the units of a pod can still reach each other
/// over `localhost`.
///
/// - host networking: every unit joins the host network and publishes nothing
/// - several units: the first keeps the ports, the others join its namespace
/// - a single unit keeps its ports on the default network
pub fn adjust(pod: &mut PodUnits, host_network: bool) {
    if host_network {
        for unit in &mut pod.units {
            unit.network_mode = NetworkMode::Host;
            unit.ports.clear();
        }
        return;
    }

    let Some((main, sidecars)) = pod.units.split_first_mut() else {
        return;
    };
    main.network_mode = NetworkMode::None;

    for unit in sidecars {
        unit.network_mode = NetworkMode::AttachTo(main.name.clone());
        unit.ports.clear();
    }
}
