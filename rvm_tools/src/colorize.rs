//! Resolves group material ids to color names and packed RGB values and
//! stamps them onto geometries.
//!
//! Colors inherit down the hierarchy. An optional attribute key lets the
//! attribute file override the color for a whole subtree. Unrecognized
//! material ids and color names are reported once each and processing
//! continues with the inherited color.

use std::collections::HashSet;

use log::warn;
use phf::phf_map;

use crate::interner::Name;
use crate::store::{GeometryId, NodeId, Store};
use crate::visitor::Visitor;

static MATERIAL_NAMES: phf::Map<u32, &'static str> = phf_map! {
    1u32 => "Black",
    2u32 => "Red",
    3u32 => "Orange",
    4u32 => "Yellow",
    5u32 => "Green",
    6u32 => "Cyan",
    7u32 => "Blue",
    8u32 => "Magenta",
    9u32 => "Brown",
    10u32 => "White",
    11u32 => "Salmon",
    12u32 => "LightGrey",
    13u32 => "Grey",
    14u32 => "Plum",
    15u32 => "WhiteSmoke",
    16u32 => "Maroon",
    17u32 => "SpringGreen",
    18u32 => "Wheat",
    19u32 => "Gold",
    20u32 => "RoyalBlue",
    21u32 => "LightGold",
    22u32 => "DeepPink",
    23u32 => "ForestGreen",
    24u32 => "BrightOrange",
    25u32 => "Ivory",
    26u32 => "Chocolate",
    27u32 => "SteelBlue",
    28u32 => "White",
    29u32 => "Midnight",
    30u32 => "NavyBlue",
    31u32 => "Pink",
    32u32 => "CoralRed",
    // The second bank repeats the first.
    33u32 => "Black",
    34u32 => "Red",
    35u32 => "Orange",
    36u32 => "Yellow",
    37u32 => "Green",
    38u32 => "Cyan",
    39u32 => "Blue",
    40u32 => "Magenta",
    41u32 => "Brown",
    42u32 => "White",
    43u32 => "Salmon",
    44u32 => "LightGrey",
    45u32 => "Grey",
    46u32 => "Plum",
    47u32 => "WhiteSmoke",
    48u32 => "Maroon",
    49u32 => "SpringGreen",
    50u32 => "Wheat",
    51u32 => "Gold",
    52u32 => "RoyalBlue",
    53u32 => "LightGold",
    54u32 => "DeepPink",
    55u32 => "ForestGreen",
    56u32 => "BrightOrange",
    57u32 => "Ivory",
    58u32 => "Chocolate",
    59u32 => "SteelBlue",
    60u32 => "White",
    61u32 => "Midnight",
    62u32 => "NavyBlue",
    63u32 => "Pink",
    64u32 => "CoralRed",
    206u32 => "Black",
    207u32 => "White",
    208u32 => "WhiteSmoke",
    209u32 => "Ivory",
    210u32 => "Grey",
    211u32 => "LightGrey",
    212u32 => "DarkGrey",
    213u32 => "DarkSlate",
    214u32 => "Red",
    215u32 => "BrightRed",
    216u32 => "CoralRed",
    217u32 => "Tomato",
    218u32 => "Plum",
    219u32 => "DeepPink",
    220u32 => "Pink",
    221u32 => "Salmon",
    222u32 => "Orange",
    223u32 => "BrightOrange",
    224u32 => "OrangeRed",
    225u32 => "Maroon",
    226u32 => "Yellow",
    227u32 => "Gold",
    228u32 => "LightYellow",
    229u32 => "LightGold",
    230u32 => "YellowGreen",
    231u32 => "SpringGreen",
    232u32 => "Green",
    233u32 => "ForestGreen",
    234u32 => "DarkGreen",
    235u32 => "Cyan",
    236u32 => "Turquoise",
    237u32 => "Aquamarine",
    238u32 => "Blue",
    239u32 => "RoyalBlue",
    240u32 => "NavyBlue",
    241u32 => "PowderBlue",
    242u32 => "Midnight",
    243u32 => "SteelBlue",
    244u32 => "Indigo",
    245u32 => "Mauve",
    246u32 => "Violet",
    247u32 => "Magenta",
    248u32 => "Beige",
    249u32 => "Wheat",
    250u32 => "Tan",
    251u32 => "SandyBrown",
    252u32 => "Brown",
    253u32 => "Khaki",
    254u32 => "Chocolate",
    255u32 => "DarkBrown",
};

// Keyed by lowercase name; lookups fold case first.
static COLOR_VALUES: phf::Map<&'static str, u32> = phf_map! {
    "aquamarine" => 0x75edc6,
    "beige" => 0xf4f4db,
    "black" => 0x000000,
    "blue" => 0x0000cc,
    "bluegrey" => 0x687c93,
    "brightorange" => 0xffa500,
    "brightred" => 0xff0000,
    "brown" => 0xcc2b2b,
    "chocolate" => 0xed7521,
    "coralred" => 0xcc5b44,
    "cyan" => 0x00eded,
    "darkbrown" => 0x8c4414,
    "darkgreen" => 0x2d4f2d,
    "darkgrey" => 0x518c8c,
    "darkslate" => 0x2d4f4f,
    "deeppink" => 0xed1189,
    "default" => 0x787878,
    "forestgreen" => 0x238e23,
    "gold" => 0xedc933,
    "green" => 0x00cc00,
    "grey" => 0xa8a8a8,
    "indigo" => 0x330066,
    "ivory" => 0xedede0,
    "khaki" => 0x9e9e5e,
    "lightgold" => 0xede8aa,
    "lightgrey" => 0xbfbfbf,
    "lightyellow" => 0xededd1,
    "magenta" => 0xdd00dd,
    "maroon" => 0x8e236b,
    "mauve" => 0x660099,
    "midnight" => 0x2d2d4f,
    "navyblue" => 0x00007f,
    "orange" => 0xed9900,
    "orangered" => 0xff7f00,
    "pink" => 0xcc919e,
    "plum" => 0x8c668c,
    "powderblue" => 0xafe0e5,
    "red" => 0xcc0000,
    "royalblue" => 0x4775ff,
    "salmon" => 0xf97f70,
    "sandybrown" => 0xf4a55e,
    "springgreen" => 0x00ff7f,
    "steelblue" => 0x4782b5,
    "tan" => 0xdb9370,
    "tomato" => 0xff6347,
    "turquoise" => 0x00bfcc,
    "violet" => 0xed82ed,
    "wheat" => 0xf4ddb2,
    "white" => 0xffffff,
    "whitesmoke" => 0xf4f4f4,
    "yellow" => 0xcccc00,
};

fn color_by_name(name: &str) -> Option<u32> {
    COLOR_VALUES.get(name.to_ascii_lowercase().as_str()).copied()
}

#[derive(Clone, Copy)]
struct StackItem {
    color_name: Name,
    color: u32,
    overridden: bool,
}

struct Colorizer {
    /// Attribute key to honor, interned once the store is known.
    pending_key: Option<String>,
    attribute_key: Option<Name>,
    default_name: Option<Name>,
    stack: Vec<StackItem>,
    nagged_materials: HashSet<u32>,
    nagged_names: HashSet<String>,
}

impl Colorizer {
    fn new(attribute_key: Option<String>) -> Self {
        Self {
            pending_key: attribute_key,
            attribute_key: None,
            default_name: None,
            stack: Vec::new(),
            nagged_materials: HashSet::new(),
            nagged_names: HashSet::new(),
        }
    }
}

impl Visitor for Colorizer {
    fn init(&mut self, store: &mut Store) {
        self.default_name = Some(store.strings.intern("Default"));
        self.attribute_key = self
            .pending_key
            .take()
            .map(|key| store.strings.intern(&key));
    }

    fn begin_group(&mut self, store: &mut Store, node: NodeId) {
        let default_name = self.default_name.unwrap();
        let mut item = match self.stack.last() {
            Some(&top) => top,
            None => StackItem {
                color_name: default_name,
                color: color_by_name("Default").unwrap(),
                overridden: false,
            },
        };

        // Material 0 keeps the color inherited from the parent; unmapped
        // ids nag once and inherit too.
        let material = store.group(node).material;
        if !item.overridden && material != 0 {
            match MATERIAL_NAMES.get(&material).copied() {
                Some(name) => match color_by_name(name) {
                    Some(color) => {
                        item.color_name = store.strings.intern(name);
                        item.color = color;
                    }
                    None => {
                        if self.nagged_names.insert(name.to_string()) {
                            warn!("Unrecognized color name {name}");
                        }
                    }
                },
                None => {
                    if self.nagged_materials.insert(material) {
                        warn!("Unrecognized material id {material}");
                    }
                }
            }
        }

        self.stack.push(item);
    }

    fn end_group(&mut self, _store: &mut Store) {
        self.stack.pop().expect("group stack underflow");
    }

    fn attribute(&mut self, store: &mut Store, _node: NodeId, key: Name, value: Name) {
        if Some(key) != self.attribute_key {
            return;
        }
        let name = store.strings.resolve(value);
        match color_by_name(name) {
            Some(color) => {
                let item = self.stack.last_mut().expect("attribute outside group");
                item.color_name = value;
                item.color = color;
                item.overridden = true;
            }
            None => {
                if self.nagged_names.insert(name.to_string()) {
                    warn!("Unrecognized color name {name}");
                }
            }
        }
    }

    fn geometry(&mut self, store: &mut Store, geometry: GeometryId) {
        let item = self.stack.last().expect("geometry outside group");
        let geometry = store.geometry_mut(geometry);
        geometry.color_name = Some(item.color_name);
        geometry.color = item.color;
    }
}

/// Stamps resolved colors onto every geometry. When `color_attribute` is
/// given, an attribute with that key overrides the material-derived color
/// for its subtree.
pub fn colorize(store: &mut Store, color_attribute: Option<&str>) {
    let mut pass = Colorizer::new(color_attribute.map(str::to_string));
    store.apply(&mut pass);
}
