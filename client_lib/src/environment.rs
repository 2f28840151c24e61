//! Catalog of the physical environments a video can be tagged with.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    BillingCounter,
    JewelleryShop,
    PetrolPump,
    VendingMachine,
}

/// Title and description of one canonical SOP step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SopTemplate {
    pub title: &'static str,
    pub description: &'static str,
}

const BILLING_COUNTER_SOP: &[SopTemplate] = &[
    SopTemplate {
        title: "Customer Approaches Billing Counter",
        description: "Customer arrives at the billing counter with items. Employee greets the customer and prepares to process the transaction.",
    },
    SopTemplate {
        title: "Employee Scans Items",
        description: "Employee scans each item's barcode. System displays item details and price. All items are verified and added to the transaction.",
    },
    SopTemplate {
        title: "Bill Generation",
        description: "System calculates total amount including taxes and discounts. Final bill is displayed on screen and presented to customer.",
    },
    SopTemplate {
        title: "Customer Makes Payment",
        description: "Customer pays via cash, card, or digital payment. Employee processes payment and verifies transaction completion.",
    },
    SopTemplate {
        title: "Receipt & Item Handover",
        description: "Receipt is printed and handed to customer. Employee carefully hands over all purchased items to customer.",
    },
    SopTemplate {
        title: "Customer Leaves",
        description: "Customer collects items and receipt, thanks the employee, and exits the billing area.",
    },
];

const JEWELLERY_SHOP_SOP: &[SopTemplate] = &[
    SopTemplate {
        title: "Customer Enters Shop",
        description: "Customer enters the jewellery shop premises. Initial security check is performed at the entrance. Customer is acknowledged by the security personnel.",
    },
    SopTemplate {
        title: "Employee Greets",
        description: "Employee greets the customer and asks about preferences and requirements. Customer is escorted to the appropriate display area.",
    },
    SopTemplate {
        title: "Item Inspection",
        description: "Customer inspects items through secured glass displays. Staff retrieves selected items for closer examination under supervision.",
    },
];

const PETROL_PUMP_SOP: &[SopTemplate] = &[
    SopTemplate {
        title: "Vehicle Arrival",
        description: "Vehicle enters the premises and approaches the designated fuel dispenser. Attendant signals the driver to the appropriate pump.",
    },
    SopTemplate {
        title: "Fuel Type Selection",
        description: "Driver communicates fuel type and quantity. Attendant confirms selection and prepares the nozzle.",
    },
    SopTemplate {
        title: "Vehicle Positioning",
        description: "Vehicle is positioned next to the pump. Engine is turned off for safety. Fuel tank cap is opened.",
    },
    SopTemplate {
        title: "Fuel Dispensing",
        description: "Attendant inserts the nozzle and dispenses fuel while monitoring the meter until the tank is full or the requested amount is reached.",
    },
    SopTemplate {
        title: "Nozzle Removal & Tank Closure",
        description: "Nozzle is removed and returned to the pump. Fuel tank cap is closed. Any spills are cleaned immediately.",
    },
    SopTemplate {
        title: "Payment Processing",
        description: "Attendant informs the total amount. Driver pays via cash, card, or digital payment. Receipt is issued upon request.",
    },
    SopTemplate {
        title: "Vehicle Exit",
        description: "Driver starts the vehicle, verifies everything is secure, and exits the fuel station premises.",
    },
];

const VENDING_MACHINE_SOP: &[SopTemplate] = &[
    SopTemplate {
        title: "Customer Comes Near Vending Machine",
        description: "Customer stands in front of the machine and views available products. Machine display shows \"Ready\".",
    },
    SopTemplate {
        title: "Presses Some Buttons",
        description: "Customer enters a product code on the keypad. Machine displays the selected product and price.",
    },
    SopTemplate {
        title: "Scans QR to Make Payment",
        description: "Customer scans the displayed QR code with a mobile payment app. Machine confirms successful payment.",
    },
    SopTemplate {
        title: "Product is Dispensed",
        description: "Machine validates the payment and releases the selected item into the collection compartment.",
    },
    SopTemplate {
        title: "Collection",
        description: "Customer opens the collection flap, retrieves the product, and verifies it is the correct item.",
    },
    SopTemplate {
        title: "Exit",
        description: "Customer closes the collection door and walks away. Machine returns to \"Ready\" for the next customer.",
    },
];

impl Environment {
    /// Catalog order. The analysis backend numbers environments from 1 in this order.
    pub const ALL: [Environment; 4] = [
        Environment::BillingCounter,
        Environment::JewelleryShop,
        Environment::PetrolPump,
        Environment::VendingMachine,
    ];

    /// Accepts the display name, the slug, or a snake_case id, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        let wanted = slugify(&s.replace('_', " "));
        match Self::ALL.iter().find(|env| env.slug() == wanted) {
            Some(env) => Ok(*env),
            None => bail!(
                "Unknown environment {}. Use one of: billing-counter | jewellery-shop | petrol-pump | vending-machine",
                s
            ),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BillingCounter => "Billing Counter",
            Self::JewelleryShop => "Jewellery Shop",
            Self::PetrolPump => "Petrol Pump",
            Self::VendingMachine => "Vending Machine",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::BillingCounter => "billing-counter",
            Self::JewelleryShop => "jewellery-shop",
            Self::PetrolPump => "petrol-pump",
            Self::VendingMachine => "vending-machine",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BillingCounter => "Standard checkout and payment processing area",
            Self::JewelleryShop => "High-security retail environment for valuable items",
            Self::PetrolPump => "Fuel dispensing and vehicle service station",
            Self::VendingMachine => "Automated self-service product dispenser",
        }
    }

    pub fn avg_duration(self) -> &'static str {
        match self {
            Self::BillingCounter => "3-5 min",
            Self::JewelleryShop => "5-8 min",
            Self::PetrolPump => "5-7 min",
            Self::VendingMachine => "1-2 min",
        }
    }

    pub fn sop(self) -> &'static [SopTemplate] {
        match self {
            Self::BillingCounter => BILLING_COUNTER_SOP,
            Self::JewelleryShop => JEWELLERY_SHOP_SOP,
            Self::PetrolPump => PETROL_PUMP_SOP,
            Self::VendingMachine => VENDING_MACHINE_SOP,
        }
    }

    /// Identifier used by the analysis backend's register call.
    pub fn env_id(self) -> u32 {
        match self {
            Self::BillingCounter => 1,
            Self::JewelleryShop => 2,
            Self::PetrolPump => 3,
            Self::VendingMachine => 4,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lowercases and collapses whitespace runs into single dashes.
pub fn slugify(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
