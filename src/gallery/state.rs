//! Gallery session state as a reducer.
//!
//! `GalleryState::reduce` takes the current state and one [`Action`] and
//! returns the next state plus an [`Effect`] for the driver to run. The only
//! effect is fetching a collection listing; its result comes back as
//! [`Action::ListingLoaded`] tagged with the sequence number it was issued
//! under, and anything but the latest request for that tab is dropped.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::layout::{PickSource, RowPacker};
use crate::models::MediaDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Gallery,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Leave the landing screen for the tabbed gallery.
    EnterGallery,
    SelectTab(String),
    ListingLoaded {
        seq: u64,
        tab: String,
        result: Result<Vec<MediaDescriptor>, String>,
    },
    /// Re-pack the selected tab's items without reshuffling.
    Reorganize,
    /// Back to the landing screen; drops every cached ordering.
    ReturnHome,
    OpenMedia(u32),
    CloseMedia,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Fetch { seq: u64, tab: String },
}

/// Packer plus the randomness it and the first-load shuffle draw from.
#[derive(Debug, Clone)]
pub struct Arranger<P> {
    pub packer: RowPacker,
    pub picker: P,
}

impl<P: PickSource> Arranger<P> {
    pub fn new(packer: RowPacker, picker: P) -> Self {
        Self { packer, picker }
    }

    fn arrange(&mut self, mut items: Vec<MediaDescriptor>, shuffle: bool) -> Vec<MediaDescriptor> {
        if shuffle {
            self.picker.shuffle(&mut items);
        }
        self.packer.pack(items, &mut self.picker)
    }
}

#[derive(Debug, Clone)]
pub struct GalleryState {
    pub view: View,
    pub selected_tab: String,
    /// Packed ordering per tab, kept until the session returns home.
    pub cache: HashMap<String, Vec<MediaDescriptor>>,
    /// What the gallery currently shows.
    pub displayed: Vec<MediaDescriptor>,
    /// The next listing to arrive gets shuffled before packing.
    pub first_load: bool,
    /// Latest outstanding request per tab.
    pub in_flight: HashMap<String, u64>,
    pub next_seq: u64,
    /// Item open in the lightbox.
    pub selected_media: Option<MediaDescriptor>,
    pub last_error: Option<String>,
}

impl Default for GalleryState {
    fn default() -> Self {
        Self::new("outfit1")
    }
}

impl GalleryState {
    pub fn new(default_tab: &str) -> Self {
        Self {
            view: View::Home,
            selected_tab: default_tab.to_string(),
            cache: HashMap::new(),
            displayed: Vec::new(),
            first_load: true,
            in_flight: HashMap::new(),
            next_seq: 0,
            selected_media: None,
            last_error: None,
        }
    }

    /// True while the selected tab is waiting on its listing.
    pub fn is_loading(&self) -> bool {
        self.in_flight.contains_key(&self.selected_tab)
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn reduce<P: PickSource>(
        mut self,
        action: Action,
        arranger: &mut Arranger<P>,
    ) -> (Self, Effect) {
        let effect = match action {
            Action::EnterGallery => {
                self.view = View::Gallery;
                self.load_selected()
            }
            Action::SelectTab(tab) => {
                self.selected_tab = tab;
                self.selected_media = None;
                if self.view == View::Gallery {
                    self.load_selected()
                } else {
                    Effect::None
                }
            }
            Action::ListingLoaded { seq, tab, result } => {
                self.apply_listing(seq, tab, result, arranger);
                Effect::None
            }
            Action::Reorganize => {
                // Input is the cached packed order; the fetched order is gone
                // after the first-load shuffle and is never reshuffled.
                let tab = self.selected_tab.clone();
                if let Some(items) = self.cache.remove(&tab) {
                    let packed = arranger.arrange(items, false);
                    self.show(&tab, &packed);
                    self.cache.insert(tab, packed);
                }
                Effect::None
            }
            Action::ReturnHome => {
                info!("Returning home, dropping {} cached tabs", self.cache.len());
                self.view = View::Home;
                self.cache.clear();
                self.displayed.clear();
                self.in_flight.clear();
                self.selected_media = None;
                self.first_load = true;
                Effect::None
            }
            Action::OpenMedia(id) => {
                self.selected_media = self.displayed.iter().find(|i| i.id == id).cloned();
                Effect::None
            }
            Action::CloseMedia => {
                self.selected_media = None;
                Effect::None
            }
        };
        (self, effect)
    }

    fn load_selected(&mut self) -> Effect {
        let tab = self.selected_tab.clone();
        if let Some(items) = self.cache.get(&tab) {
            debug!("Tab {} served from cache", tab);
            self.displayed = items.clone();
            return Effect::None;
        }
        if self.in_flight.contains_key(&tab) {
            return Effect::None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(tab.clone(), seq);
        Effect::Fetch { seq, tab }
    }

    fn apply_listing<P: PickSource>(
        &mut self,
        seq: u64,
        tab: String,
        result: Result<Vec<MediaDescriptor>, String>,
        arranger: &mut Arranger<P>,
    ) {
        if self.in_flight.get(&tab) != Some(&seq) {
            debug!("Dropping stale listing for {} (seq {})", tab, seq);
            return;
        }
        self.in_flight.remove(&tab);

        match result {
            Ok(items) => {
                let shuffle = self.first_load;
                self.first_load = false;
                let packed = arranger.arrange(items, shuffle);
                debug!("Packed {} items for {} (shuffled: {})", packed.len(), tab, shuffle);
                self.show(&tab, &packed);
                self.cache.insert(tab, packed);
                self.last_error = None;
            }
            Err(e) => {
                warn!("Error loading media for {}: {}", tab, e);
                self.last_error = Some(e);
            }
        }
    }

    fn show(&mut self, tab: &str, items: &[MediaDescriptor]) {
        if self.view == View::Gallery && self.selected_tab == tab {
            self.displayed = items.to_vec();
        }
    }
}
