use std::collections::{btree_map, BTreeMap};

use simbus_shared::{
    BitValue, ConnectionKey, DeviceIdent, DeviceOptions, SignalMap, SignalVector, SignalWidths,
    SimTime,
};

use super::bus_config::DeviceConfig;

/// Server side state of one configured participant
pub struct ParticipantSlot {
    device: DeviceConfig,
    options: DeviceOptions,
    client_widths: SignalWidths,
    // last values the participant offered
    client_signals: SignalMap,
    // values to deliver with the next UNTIL
    send_signals: SignalMap,
    ready: bool,
    finish: bool,
    claimed: bool,
    offered_time: Option<SimTime>,
    connection: Option<ConnectionKey>,
}

impl ParticipantSlot {
    pub(crate) fn new(device: DeviceConfig) -> Self {
        Self {
            device,
            options: DeviceOptions::new(),
            client_widths: SignalWidths::new(),
            client_signals: SignalMap::new(),
            send_signals: SignalMap::new(),
            ready: false,
            finish: false,
            claimed: false,
            offered_time: None,
            connection: None,
        }
    }

    pub fn ident(&self) -> DeviceIdent {
        self.device.ident
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }

    pub fn is_host(&self) -> bool {
        self.device.host
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// Options announced in HELLO
    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn client_widths(&self) -> &SignalWidths {
        &self.client_widths
    }

    /// Finished participants count as ready
    pub fn is_ready(&self) -> bool {
        self.ready || self.finish
    }

    pub fn is_finished(&self) -> bool {
        self.finish
    }

    /// Whether a HELLO has ever been accepted for this slot
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn connection(&self) -> Option<ConnectionKey> {
        self.connection
    }

    pub fn offered_time(&self) -> Option<SimTime> {
        self.offered_time
    }

    /// The value this participant drives on `name`, `HiZ` if it drives
    /// nothing there.
    pub fn client_signal(&self, name: &str) -> SignalVector {
        match self.client_signals.get(name) {
            Some(value) => value.clone(),
            None => SignalVector::hiz(self.client_widths.get(name).unwrap_or(1)),
        }
    }

    /// Bit 0 of `client_signal`
    pub fn client_bit(&self, name: &str) -> BitValue {
        self.client_signals
            .get(name)
            .and_then(|value| value.get(0))
            .unwrap_or(BitValue::HiZ)
    }

    pub fn send_signals(&self) -> &SignalMap {
        &self.send_signals
    }

    pub fn send(&mut self, name: &str, value: SignalVector) {
        match self.send_signals.get_mut(name) {
            Some(current) => *current = value,
            None => {
                self.send_signals.insert(name.to_string(), value);
            }
        }
    }

    pub fn send_bit(&mut self, name: &str, value: BitValue) {
        self.send(name, SignalVector::bit(value));
    }

    pub(crate) fn claim(
        &mut self,
        connection: ConnectionKey,
        options: DeviceOptions,
        widths: SignalWidths,
    ) {
        self.client_signals = widths.filled(BitValue::HiZ);
        self.client_widths = widths;
        self.options = options;
        self.connection = Some(connection);
        self.claimed = true;
    }

    /// Stores an offer; signals left out keep their previous values.
    pub(crate) fn offer(&mut self, time: SimTime, signals: SignalMap) {
        self.client_signals.extend(signals);
        self.offered_time = Some(time);
        self.ready = true;
    }

    /// Retires the participant: it counts as ready from now on and drives
    /// nothing.
    pub(crate) fn park(&mut self) {
        for value in self.client_signals.values_mut() {
            *value = SignalVector::hiz(value.width());
        }
        self.ready = true;
        self.finish = true;
    }

    pub(crate) fn clear_ready(&mut self) {
        self.ready = false;
    }

    pub(crate) fn take_connection(&mut self) -> Option<ConnectionKey> {
        self.connection.take()
    }
}

/// Every slot of one bus, ordered by identity
#[derive(Default)]
pub struct Participants {
    slots: BTreeMap<DeviceIdent, ParticipantSlot>,
}

impl Participants {
    pub fn new(devices: &[DeviceConfig]) -> Self {
        Self {
            slots: devices
                .iter()
                .map(|device| (device.ident, ParticipantSlot::new(device.clone())))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, ident: DeviceIdent) -> Option<&ParticipantSlot> {
        self.slots.get(&ident)
    }

    pub fn get_mut(&mut self, ident: DeviceIdent) -> Option<&mut ParticipantSlot> {
        self.slots.get_mut(&ident)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut ParticipantSlot> {
        self.slots.values_mut().find(|slot| slot.name() == name)
    }

    pub fn iter(&self) -> btree_map::Values<'_, DeviceIdent, ParticipantSlot> {
        self.slots.values()
    }

    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, DeviceIdent, ParticipantSlot> {
        self.slots.values_mut()
    }

    pub fn is_all_ready(&self) -> bool {
        self.slots.values().all(ParticipantSlot::is_ready)
    }

    pub fn is_all_finished(&self) -> bool {
        self.slots.values().all(ParticipantSlot::is_finished)
    }

    /// Identity of the single host of a paired bus
    pub fn host(&self) -> Option<DeviceIdent> {
        self.slots.values().find(|slot| slot.is_host()).map(ParticipantSlot::ident)
    }

    /// Identity of the single non-host of a paired bus
    pub fn device(&self) -> Option<DeviceIdent> {
        self.slots.values().find(|slot| !slot.is_host()).map(ParticipantSlot::ident)
    }
}
