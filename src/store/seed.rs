use crate::model::car::Car;

/// Hard-coded demo fleet. Also the fallback dataset when a demo-mode
/// persistence file turns out to be corrupt.
pub fn demo_fleet() -> Vec<Car> {
    vec![
        Car {
            id: 1,
            name: "2016 Toyota Camry".into(),
            car_type: "Sedan".into(),
            price_per_day: 4500,
            seats: 4,
            transmission: "Automatic".into(),
            fuel_type: "Gasoline".into(),
            plate_number: "DIWATA001".into(),
            year: 2016,
            description: Some(
                "A reliable and comfortable sedan perfect for city driving and longer trips."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
        Car {
            id: 2,
            name: "2018 Honda Civic".into(),
            car_type: "Sedan".into(),
            price_per_day: 4200,
            seats: 5,
            transmission: "Automatic".into(),
            fuel_type: "Gasoline".into(),
            plate_number: "DIWATA002".into(),
            year: 2018,
            description: Some(
                "A sporty and fuel-efficient sedan with modern features and excellent handling."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
        Car {
            id: 3,
            name: "2020 Ford Explorer".into(),
            car_type: "SUV".into(),
            price_per_day: 6500,
            seats: 7,
            transmission: "Automatic".into(),
            fuel_type: "Gasoline".into(),
            plate_number: "DIWATA003".into(),
            year: 2020,
            description: Some(
                "A spacious SUV perfect for family trips and adventures with plenty of cargo space."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
        Car {
            id: 4,
            name: "2019 Mitsubishi Montero".into(),
            car_type: "SUV".into(),
            price_per_day: 5800,
            seats: 7,
            transmission: "Automatic".into(),
            fuel_type: "Diesel".into(),
            plate_number: "DIWATA004".into(),
            year: 2019,
            description: Some(
                "A rugged and reliable SUV with excellent off-road capabilities and comfortable interior."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
        Car {
            id: 5,
            name: "2021 Mazda 3".into(),
            car_type: "Hatchback".into(),
            price_per_day: 4800,
            seats: 5,
            transmission: "Manual".into(),
            fuel_type: "Gasoline".into(),
            plate_number: "DIWATA005".into(),
            year: 2021,
            description: Some(
                "A stylish hatchback with sporty handling and modern features for an enjoyable driving experience."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
        Car {
            id: 6,
            name: "2017 Toyota Fortuner".into(),
            car_type: "SUV".into(),
            price_per_day: 5500,
            seats: 7,
            transmission: "Manual".into(),
            fuel_type: "Diesel".into(),
            plate_number: "DIWATA006".into(),
            year: 2017,
            description: Some(
                "A versatile SUV with excellent durability and performance on various terrains."
                    .into(),
            ),
            image_url: None,
            images: Vec::new(),
            available: true,
        },
    ]
}
