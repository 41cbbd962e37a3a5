/// masses of the most abundant isotope of each element in amu, indexed by
/// atomic number. index 0 is a dummy atom
pub const WEIGHTS: [f64; 55] = [
    0.0,
    1.00782503223,
    4.00260325413,
    7.0160034366,
    9.012183065,
    11.00930536,
    12.0,
    14.00307400443,
    15.99491461957,
    18.99840316273,
    19.9924401762,
    22.989769282,
    23.985041697,
    26.98153853,
    27.97692653465,
    30.97376199842,
    31.9720711744,
    34.968852682,
    39.9623831237,
    38.9637064864,
    39.962590863,
    44.95590828,
    47.94794198,
    50.94395704,
    51.94050623,
    54.93804391,
    55.93493633,
    58.93319429,
    57.93534241,
    62.92959772,
    63.92914201,
    68.9255735,
    73.921177761,
    74.92159457,
    79.9165218,
    78.9183376,
    83.9114977282,
    84.9117897379,
    87.9056125,
    88.9058403,
    89.9046977,
    92.906373,
    97.90540482,
    97.9072124,
    101.9043441,
    102.905498,
    105.9034804,
    106.9050916,
    113.90336509,
    114.903878776,
    119.90220163,
    120.903812,
    129.906222748,
    126.9044719,
    131.9041550856,
];
