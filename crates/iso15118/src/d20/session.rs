//! Session identity and negotiated service parameters

use std::collections::BTreeMap;

use rand::RngCore;
use thiserror::Error;

use super::config::{DcBptParameterList, DcParameterList, InternetParameterList, ParkingParameterList};
use crate::message::{
    AcConnector, Authorization, BptChannel, ControlMode, DcConnector, GeneratorMode,
    MobilityNeedsMode, Pricing, SelectedService, ServiceCategory, SessionId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Service {0} has no selectable parameter sets")]
    UnsupportedService(ServiceCategory),

    #[error("Parameter set {id} not offered for service {service}")]
    UnknownParameterSet { service: ServiceCategory, id: u16 },
}

/// Services advertised to the EV during discovery/detail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferedServices {
    pub auth_services: Vec<Authorization>,
    pub energy_services: Vec<ServiceCategory>,
    pub vas_services: Vec<u16>,

    pub dc_parameter_list: BTreeMap<u16, DcParameterList>,
    pub dc_bpt_parameter_list: BTreeMap<u16, DcBptParameterList>,
    pub internet_parameter_list: BTreeMap<u16, InternetParameterList>,
    pub parking_parameter_list: BTreeMap<u16, ParkingParameterList>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    Ac(AcConnector),
    Dc(DcConnector),
}

/// Parameters of the energy service the EV selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedServiceParameters {
    pub selected_energy_service: ServiceCategory,
    pub selected_connector: Connector,
    pub selected_control_mode: ControlMode,
    pub selected_mobility_needs_mode: MobilityNeedsMode,
    pub selected_pricing: Pricing,
    pub selected_bpt_channel: Option<BptChannel>,
    pub selected_generator_mode: Option<GeneratorMode>,
}

impl SelectedServiceParameters {
    fn dc(service: ServiceCategory, list: &DcParameterList) -> Self {
        Self {
            selected_energy_service: service,
            selected_connector: Connector::Dc(list.connector),
            selected_control_mode: list.control_mode,
            selected_mobility_needs_mode: list.mobility_needs_mode,
            selected_pricing: list.pricing,
            selected_bpt_channel: None,
            selected_generator_mode: None,
        }
    }

    fn dc_bpt(service: ServiceCategory, list: &DcBptParameterList) -> Self {
        Self {
            selected_bpt_channel: Some(list.bpt_channel),
            selected_generator_mode: Some(list.generator_mode),
            ..Self::dc(service, &list.dc)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    pub offered_services: OfferedServices,
    selected_services: Option<SelectedServiceParameters>,
    selected_vas: Vec<SelectedService>,
    pub service_renegotiation_supported: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// New session with a random 8 byte identifier
    pub fn new() -> Self {
        let mut id = SessionId::default();
        rand::thread_rng().fill_bytes(&mut id);
        Self {
            id,
            offered_services: OfferedServices::default(),
            selected_services: None,
            selected_vas: Vec::new(),
            service_renegotiation_supported: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn id_hex(&self) -> String {
        hex::encode_upper(self.id)
    }

    /// Is `id` an offered parameter set of `service`
    pub fn find_parameter_set_id(&self, service: ServiceCategory, id: u16) -> bool {
        let offered = &self.offered_services;
        match service {
            ServiceCategory::Dc => offered.dc_parameter_list.contains_key(&id),
            ServiceCategory::DcBpt => offered.dc_bpt_parameter_list.contains_key(&id),
            ServiceCategory::Internet => offered.internet_parameter_list.contains_key(&id),
            ServiceCategory::ParkingStatus => offered.parking_parameter_list.contains_key(&id),
            _ => false,
        }
    }

    /// Commit the energy service selection; the previous selection is kept on error
    pub fn select_service_parameters(
        &mut self,
        service: ServiceCategory,
        id: u16,
    ) -> Result<(), SessionError> {
        let offered = &self.offered_services;
        let selected = match service {
            ServiceCategory::Dc => offered
                .dc_parameter_list
                .get(&id)
                .map(|list| SelectedServiceParameters::dc(service, list)),
            ServiceCategory::DcBpt => offered
                .dc_bpt_parameter_list
                .get(&id)
                .map(|list| SelectedServiceParameters::dc_bpt(service, list)),
            other => return Err(SessionError::UnsupportedService(other)),
        };

        let selected = selected.ok_or(SessionError::UnknownParameterSet { service, id })?;
        self.selected_services = Some(selected);
        Ok(())
    }

    pub fn selected_services(&self) -> Option<&SelectedServiceParameters> {
        self.selected_services.as_ref()
    }

    pub fn select_vas_services(&mut self, vas: Vec<SelectedService>) {
        self.selected_vas = vas;
    }

    pub fn selected_vas_services(&self) -> &[SelectedService] {
        &self.selected_vas
    }
}
