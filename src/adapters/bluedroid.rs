//! Bluedroid link adapter.
//!
//! Implements [`LinkStackPort`] over the Bluedroid GAP / GATTS API and
//! turns the stack callbacks into [`StackEvent`]s.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: controller and Bluedroid brought up with
//!   `esp_idf_svc::bt::BtDriver`, raw `extern "C"` GAP / GATTS callbacks,
//!   raw request calls.
//! - **all other targets**: a logging stub that accepts every request.
//!
//! ## Callback context
//!
//! Bluedroid callbacks are C function pointers running on the BTC task.
//! They cannot capture state, so each one copies what it needs out of the
//! parameter union and posts it to [`STACK_EVENTS`](crate::channels::STACK_EVENTS).
//! Nothing in the callback touches the display or the profile table.

use log::info;

use crate::app::ports::LinkStackPort;
use crate::error::LinkError;
use crate::gatt::{
    AdvertisingData, AdvertisingParams, AttrPermissions, CharProperties, ConnId, GattStatus,
    InterfaceId, ServiceId,
};

#[cfg(target_os = "espidf")]
use crate::error::InitError;
#[cfg(target_os = "espidf")]
use crate::gatt::{BdAddr, GapEvent, GattsEvent, StackEvent, WriteRequest};

// ───────────────────────────────────────────────────────────────
// Stack bring-up
// ───────────────────────────────────────────────────────────────

/// Owns the controller.  Dropping it tears the stack down.
#[cfg(target_os = "espidf")]
pub type BtStack = esp_idf_svc::bt::BtDriver<'static, esp_idf_svc::bt::Ble>;

/// Bring up the controller in BLE mode, enable Bluedroid and install the
/// GAP / GATTS callbacks.  No application is registered yet.
#[cfg(target_os = "espidf")]
pub fn start_stack(
    modem: esp_idf_svc::hal::modem::Modem,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
) -> Result<BtStack, InitError> {
    use esp_idf_svc::sys::*;

    let driver = BtStack::new(modem, Some(nvs)).map_err(|e| InitError::BtStack(e.code()))?;

    // SAFETY: both handlers are `extern "C"` and only read the parameter
    // union for the event they are called with.
    unsafe {
        let ret = esp_ble_gatts_register_callback(Some(gatts_event_handler));
        if ret != ESP_OK as i32 {
            return Err(InitError::CallbackRegister(ret));
        }
        let ret = esp_ble_gap_register_callback(Some(gap_event_handler));
        if ret != ESP_OK as i32 {
            return Err(InitError::CallbackRegister(ret));
        }
    }
    info!("BLE(espidf): controller + Bluedroid up, callbacks installed");
    Ok(driver)
}

// ───────────────────────────────────────────────────────────────
// Callbacks (BTC task context)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn post(event: StackEvent) {
    crate::channels::post_stack_event(event);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    if param.is_null() {
        return;
    }
    let status = |raw: esp_bt_status_t| GattStatus::from_raw(raw as u8);
    // SAFETY: the stack passes a valid union; each arm reads the member
    // that matches `event`.
    let gap = unsafe {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => GapEvent::AdvDataSet {
                status: status((*param).adv_data_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                GapEvent::ScanResponseSet {
                    status: status((*param).scan_rsp_data_cmpl.status),
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => GapEvent::AdvStarted {
                status: status((*param).adv_start_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => GapEvent::AdvStopped {
                status: status((*param).adv_stop_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
                let p = &(*param).update_conn_params;
                GapEvent::ConnParamsUpdated {
                    status: status(p.status),
                    remote: BdAddr(p.bda),
                    min_int: p.min_int,
                    max_int: p.max_int,
                    conn_int: p.conn_int,
                    latency: p.latency,
                    timeout: p.timeout,
                }
            }
            _ => return,
        }
    };
    post(StackEvent::Gap(gap));
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    if param.is_null() {
        return;
    }
    let status = |raw: esp_gatt_status_t| GattStatus::from_raw(raw as u8);
    // SAFETY: as above.  UUID unions are read as 16-bit because every
    // attribute this firmware creates uses a 16-bit UUID.
    let gatts = unsafe {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                let p = &(*param).reg;
                GattsEvent::Registered {
                    status: status(p.status),
                    app_id: p.app_id,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let p = &(*param).create;
                GattsEvent::ServiceCreated {
                    status: status(p.status),
                    service_handle: p.service_handle,
                    uuid: p.service_id.id.uuid.uuid.uuid16,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_START_EVT => {
                let p = &(*param).start;
                GattsEvent::ServiceStarted {
                    status: status(p.status),
                    service_handle: p.service_handle,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let p = &(*param).add_char;
                GattsEvent::CharacteristicAdded {
                    status: status(p.status),
                    attr_handle: p.attr_handle,
                    service_handle: p.service_handle,
                    uuid: p.char_uuid.uuid.uuid16,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = &(*param).connect;
                GattsEvent::Connected {
                    conn_id: p.conn_id,
                    remote: BdAddr(p.remote_bda),
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let p = &(*param).disconnect;
                GattsEvent::Disconnected {
                    conn_id: p.conn_id,
                    remote: BdAddr(p.remote_bda),
                    reason: p.reason as u16,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = &(*param).read;
                GattsEvent::Read {
                    conn_id: p.conn_id,
                    trans_id: p.trans_id,
                    handle: p.handle,
                    offset: p.offset,
                    need_rsp: p.need_rsp,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = &(*param).write;
                let payload: &[u8] = if p.value.is_null() || p.len == 0 {
                    &[]
                } else {
                    core::slice::from_raw_parts(p.value, usize::from(p.len))
                };
                let mut req = WriteRequest::new(p.conn_id, p.trans_id, p.handle, payload);
                req.offset = p.offset;
                req.need_rsp = p.need_rsp;
                req.is_prep = p.is_prep;
                GattsEvent::Write(req)
            }
            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                let p = &(*param).mtu;
                GattsEvent::MtuChanged {
                    conn_id: p.conn_id,
                    mtu: p.mtu,
                }
            }
            _ => return,
        }
    };
    post(StackEvent::Gatts {
        interface: InterfaceId(gatts_if),
        event: gatts,
    });
}

// ───────────────────────────────────────────────────────────────
// Requests
// ───────────────────────────────────────────────────────────────

/// Issues GAP / GATTS requests.  Stateless: every outcome comes back
/// through the callbacks.
pub struct BluedroidLink {
    _private: (),
}

impl Default for BluedroidLink {
    fn default() -> Self {
        Self::new()
    }
}

impl BluedroidLink {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_os = "espidf")]
fn check(op: &'static str, ret: esp_idf_svc::sys::esp_err_t) -> Result<(), LinkError> {
    if ret == esp_idf_svc::sys::ESP_OK as i32 {
        Ok(())
    } else {
        Err(LinkError::new(op, ret))
    }
}

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: plain C struct, all-zero is a valid value.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = esp_idf_svc::sys::ESP_UUID_LEN_16 as u16;
    t.uuid.uuid16 = uuid;
    t
}

#[cfg(target_os = "espidf")]
impl LinkStackPort for BluedroidLink {
    fn register_app(&mut self, app_id: u16) -> Result<(), LinkError> {
        // SAFETY: plain FFI call with a value argument.
        check("register_app", unsafe { esp_idf_svc::sys::esp_ble_gatts_app_register(app_id) })
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), LinkError> {
        let name = std::ffi::CString::new(name).map_err(|_| {
            LinkError::new("set_device_name", esp_idf_svc::sys::ESP_ERR_INVALID_ARG as i32)
        })?;
        // SAFETY: `name` is NUL-terminated and outlives the call; the stack copies it.
        check("set_device_name", unsafe {
            esp_idf_svc::sys::esp_ble_gap_set_device_name(name.as_ptr())
        })
    }

    fn configure_adv_data(&mut self, data: &AdvertisingData) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        let mut uuid = data.service_uuid128;
        let mut adv = esp_ble_adv_data_t {
            set_scan_rsp: false,
            include_name: data.include_name,
            include_txpower: data.include_tx_power,
            min_interval: i32::from(data.min_interval),
            max_interval: i32::from(data.max_interval),
            appearance: i32::from(data.appearance),
            manufacturer_len: 0,
            p_manufacturer_data: core::ptr::null_mut(),
            service_data_len: 0,
            p_service_data: core::ptr::null_mut(),
            service_uuid_len: uuid.len() as u16,
            p_service_uuid: uuid.as_mut_ptr(),
            flag: data.flags,
            // SAFETY: all-zero is valid for any field this IDF version adds.
            ..unsafe { core::mem::zeroed() }
        };
        // SAFETY: Bluedroid deep-copies the payload before returning.
        check("configure_adv_data", unsafe { esp_ble_gap_config_adv_data(&mut adv) })
    }

    fn create_service(
        &mut self,
        interface: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        let mut id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: uuid16_to_esp(service.uuid),
                inst_id: service.inst_id,
            },
            is_primary: service.is_primary,
        };
        // SAFETY: `id` is copied by the stack.
        check("create_service", unsafe {
            esp_ble_gatts_create_service(interface.0, &mut id, num_handles)
        })
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), LinkError> {
        // SAFETY: plain FFI call with a value argument.
        check("start_service", unsafe {
            esp_idf_svc::sys::esp_ble_gatts_start_service(service_handle)
        })
    }

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        uuid: u16,
        perm: AttrPermissions,
        props: CharProperties,
    ) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        let mut char_uuid = uuid16_to_esp(uuid);
        // SAFETY: `char_uuid` is copied; null value/control means the
        // application answers reads and writes itself.
        check("add_characteristic", unsafe {
            esp_ble_gatts_add_char(
                service_handle,
                &mut char_uuid,
                perm.0 as esp_gatt_perm_t,
                props.0 as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            )
        })
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        // SAFETY: all-zero is valid for the remaining fields (no peer address).
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: params.interval_min,
            adv_int_max: params.interval_max,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        // SAFETY: `adv_params` is copied by the stack.
        check("start_advertising", unsafe { esp_ble_gap_start_advertising(&mut adv_params) })
    }

    fn send_write_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), LinkError> {
        // SAFETY: a null response body is allowed for write acknowledgements.
        check("send_write_response", unsafe {
            esp_idf_svc::sys::esp_ble_gatts_send_response(
                interface.0,
                conn_id,
                trans_id,
                esp_idf_svc::sys::esp_gatt_status_t::from(status.raw()),
                core::ptr::null_mut(),
            )
        })
    }

    fn send_read_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        handle: u16,
        status: GattStatus,
        value: &[u8],
    ) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        // SAFETY: plain C union, all-zero is valid.
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        // SAFETY: `attr_value` is the member the stack reads for read responses.
        unsafe {
            let attr = &mut rsp.attr_value;
            let len = value.len().min(attr.value.len());
            attr.value[..len].copy_from_slice(&value[..len]);
            attr.len = len as u16;
            attr.handle = handle;
            attr.offset = 0;
        }
        // SAFETY: `rsp` is copied by the stack.
        check("send_read_response", unsafe {
            esp_ble_gatts_send_response(
                interface.0,
                conn_id,
                trans_id,
                esp_gatt_status_t::from(status.raw()),
                &mut rsp,
            )
        })
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), LinkError> {
        // SAFETY: plain FFI call with a value argument.
        check("set_local_mtu", unsafe { esp_idf_svc::sys::esp_ble_gatt_set_local_mtu(mtu) })
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl LinkStackPort for BluedroidLink {
    fn register_app(&mut self, app_id: u16) -> Result<(), LinkError> {
        info!("BLE(sim): register app {}", app_id);
        Ok(())
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), LinkError> {
        info!("BLE(sim): device name '{}'", name);
        Ok(())
    }

    fn configure_adv_data(&mut self, data: &AdvertisingData) -> Result<(), LinkError> {
        log::debug!("BLE(sim): adv data {:?}", data);
        Ok(())
    }

    fn create_service(
        &mut self,
        interface: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), LinkError> {
        log::debug!(
            "BLE(sim): create service 0x{:04X} on {} ({} handles)",
            service.uuid, interface, num_handles
        );
        Ok(())
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), LinkError> {
        log::debug!("BLE(sim): start service {}", service_handle);
        Ok(())
    }

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        uuid: u16,
        _perm: AttrPermissions,
        _props: CharProperties,
    ) -> Result<(), LinkError> {
        log::debug!("BLE(sim): add char 0x{:04X} to service {}", uuid, service_handle);
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), LinkError> {
        info!(
            "BLE(sim): advertising ({}..{} × 0.625 ms)",
            params.interval_min, params.interval_max
        );
        Ok(())
    }

    fn send_write_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), LinkError> {
        log::debug!("BLE(sim): write rsp {} conn {} trans {} {}", interface, conn_id, trans_id, status);
        Ok(())
    }

    fn send_read_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        handle: u16,
        status: GattStatus,
        value: &[u8],
    ) -> Result<(), LinkError> {
        log::debug!(
            "BLE(sim): read rsp {} conn {} trans {} handle {} {} ({} bytes)",
            interface,
            conn_id,
            trans_id,
            handle,
            status,
            value.len()
        );
        Ok(())
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), LinkError> {
        log::debug!("BLE(sim): local MTU {}", mtu);
        Ok(())
    }
}
